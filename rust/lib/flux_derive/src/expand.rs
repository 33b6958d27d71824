use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{Ident, ItemStruct, LitStr, Path, Token};

#[derive(Clone, Copy)]
pub enum Kind {
    State,
    Request,
}

impl Kind {
    fn required_derives(self) -> &'static [&'static str] {
        match self {
            Kind::State => &["Debug", "Clone", "PartialEq"],
            Kind::Request => &["Debug", "Clone"],
        }
    }

    fn label(self) -> &'static str {
        match self {
            Kind::State => "state",
            Kind::Request => "request",
        }
    }
}

pub fn expand(kind: Kind, attr: TokenStream, item: ItemStruct) -> syn::Result<TokenStream> {
    let lit: LitStr = syn::parse2(attr)?;
    let path = lit.value();
    if path.is_empty() {
        return Err(syn::Error::new(
            lit.span(),
            format!("{} path cannot be empty", kind.label()),
        ));
    }
    if path.contains('+') || path.contains('#') {
        return Err(syn::Error::new(
            lit.span(),
            format!("{} path cannot contain wildcards", kind.label()),
        ));
    }

    let existing = derived_idents(&item);
    let missing: Vec<Ident> = kind
        .required_derives()
        .iter()
        .filter(|d| !existing.iter().any(|e| e == *d))
        .map(|d| Ident::new(d, Span::call_site()))
        .collect();
    let extra = if missing.is_empty() {
        quote! {}
    } else {
        quote! { #[derive(#(#missing),*)] }
    };

    let name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();
    let doc = format!("The Flux {} path.", kind.label());

    Ok(quote! {
        #extra
        #item

        impl #impl_generics #name #ty_generics #where_clause {
            #[doc = #doc]
            pub const PATH: &'static str = #path;
        }
    })
}

/// Last path segment of every trait in the struct's `#[derive(...)]` lists.
fn derived_idents(item: &ItemStruct) -> Vec<String> {
    item.attrs
        .iter()
        .filter(|a| a.path().is_ident("derive"))
        .filter_map(|a| {
            a.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated)
                .ok()
        })
        .flatten()
        .filter_map(|p| p.segments.last().map(|s| s.ident.to_string()))
        .collect()
}
