//! Flux attribute macros.
//!
//! - `#[state("path")]` marks a struct stored at a well-known state path
//! - `#[request("path")]` marks a struct emitted to a request path
//!
//! Both add `impl T { pub const PATH: &'static str = "path"; }` and the
//! derives the Flux store needs. States also get `PartialEq` so views
//! can skip re-rendering unchanged values.

use proc_macro::TokenStream;
use syn::parse_macro_input;

mod expand;

use expand::Kind;

/// Define a Flux state type.
///
/// ```ignore
/// #[state("app/modal")]
/// pub struct ModalState {
///     pub add_post_open: bool,
/// }
/// ```
///
/// Adds `#[derive(Debug, Clone, PartialEq)]` for any of those not
/// already derived.
#[proc_macro_attribute]
pub fn state(attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as syn::ItemStruct);
    expand::expand(Kind::State, attr.into(), item)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Define a Flux request type.
///
/// ```ignore
/// #[request("compose/update-caption")]
/// pub struct UpdateCaptionReq {
///     pub value: String,
/// }
/// ```
///
/// Adds `#[derive(Debug, Clone)]` for any of those not already derived.
#[proc_macro_attribute]
pub fn request(attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as syn::ItemStruct);
    expand::expand(Kind::Request, attr.into(), item)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
