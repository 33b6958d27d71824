//! Flux wiring for the add-post modal.
//!
//! `register_handlers` binds every compose request to its handler. The
//! modal is mounted by `modal/open-add-post` and unmounted whenever
//! `app/modal` flips to closed, whether that came from an explicit close,
//! an outside click or a successful submit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use picpost_blob::BlobStore;
use picpost_docs::DocumentStore;
use picpost_flux::{Flux, StateStore};
use tracing::{debug, info, warn};

use crate::composer::{CloseSignal, PostComposer, StateObserver, SubmitOutcome};
use crate::config::ComposerConfig;
use crate::dismiss::{ListenerGuard, NodeId, Page, PointerEvent};
use crate::model::AuthenticatedUser;
use crate::picker::PickOutcome;
use crate::request::*;
use crate::state::*;

/// Backends and page the modal is built against.
pub struct ComposeContext {
    pub docs: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub config: ComposerConfig,
    pub page: Arc<Page>,
    /// Root node of the modal's content box.
    pub content: NodeId,
    mounted: Mutex<Option<Mounted>>,
}

/// A live composer and its outside-click listener.
struct Mounted {
    composer: Arc<PostComposer>,
    /// Cleared on unmount so a composer that outlives its mount can
    /// neither publish state nor close a later mount.
    live: Arc<AtomicBool>,
    _dismiss: ListenerGuard,
}

impl ComposeContext {
    pub fn new(
        docs: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        config: ComposerConfig,
        page: Arc<Page>,
        content: NodeId,
    ) -> Self {
        Self {
            docs,
            blobs,
            config,
            page,
            content,
            mounted: Mutex::new(None),
        }
    }

    /// The mounted composer, if the modal is open.
    pub fn composer(&self) -> Option<Arc<PostComposer>> {
        self.mounted
            .lock()
            .unwrap()
            .as_ref()
            .map(|m| Arc::clone(&m.composer))
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.lock().unwrap().is_some()
    }

    /// Returns false if a composer was already mounted.
    fn mount(&self, store: &Arc<StateStore>, user: AuthenticatedUser) -> bool {
        let mut slot = self.mounted.lock().unwrap();
        if slot.is_some() {
            return false;
        }

        let live = Arc::new(AtomicBool::new(true));
        let observer: StateObserver = {
            let store = Arc::downgrade(store);
            let live = Arc::clone(&live);
            Arc::new(move |state: &ComposerState| {
                if !live.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(store) = store.upgrade() {
                    store.set(ComposerState::PATH, state.clone());
                }
            })
        };
        let on_close = close_signal(Arc::downgrade(store), Arc::clone(&live));

        let composer = Arc::new(
            PostComposer::new(
                user,
                Arc::clone(&self.docs),
                Arc::clone(&self.blobs),
                on_close,
                self.config.clone(),
            )
            .with_observer(observer),
        );
        let dismiss = composer.mount(&self.page, self.content);
        *slot = Some(Mounted {
            composer,
            live,
            _dismiss: dismiss,
        });
        true
    }

    /// Drop the mounted composer. Returns false if nothing was mounted.
    fn unmount(&self, store: &StateStore) -> bool {
        let Some(mounted) = self.mounted.lock().unwrap().take() else {
            return false;
        };
        mounted.live.store(false, Ordering::SeqCst);
        store.remove(ComposerState::PATH);
        true
    }
}

/// The close signal handed to each composer: mark the modal closed, but
/// only while that composer's mount is live.
fn close_signal(store: Weak<StateStore>, live: Arc<AtomicBool>) -> CloseSignal {
    Arc::new(move || {
        if !live.load(Ordering::SeqCst) {
            debug!("close from an unmounted composer ignored");
            return;
        }
        if let Some(store) = store.upgrade() {
            store.set(ModalState::PATH, ModalState { add_post_open: false });
        }
    })
}

/// Register all compose handlers with a Flux instance.
pub fn register_handlers(flux: &Flux, ctx: Arc<ComposeContext>) {
    // app/modal: unmount whenever the modal closes.
    {
        let ctx = ctx.clone();
        let store = Arc::downgrade(flux.store());
        flux.subscribe(ModalState::PATH, move |_, value| {
            let open = value
                .downcast_ref::<ModalState>()
                .is_some_and(|m| m.add_post_open);
            if open {
                return;
            }
            let Some(store) = store.upgrade() else {
                return;
            };
            if ctx.unmount(&store) {
                info!("add-post modal closed");
            }
        });
    }

    // modal/open-add-post
    {
        let ctx = ctx.clone();
        flux.on(OpenAddPostReq::PATH, move |_, _, store: Arc<StateStore>| {
            let ctx = ctx.clone();
            async move {
                let user = store
                    .get_as::<Session>(Session::PATH)
                    .and_then(|s| s.user);
                let Some(user) = user else {
                    warn!("add-post requested without a signed-in user");
                    return;
                };
                let uid = user.uid.clone();
                if !ctx.mount(&store, user) {
                    debug!("add-post modal already open");
                    return;
                }
                store.set(ComposerState::PATH, ComposerState::empty());
                store.set(ModalState::PATH, ModalState { add_post_open: true });
                info!(%uid, "add-post modal opened");
            }
        });
    }

    // modal/close-add-post
    flux.on(CloseAddPostReq::PATH, |_, _, store: Arc<StateStore>| async move {
        store.set(ModalState::PATH, ModalState { add_post_open: false });
    });

    // compose/pick-image
    {
        let ctx = ctx.clone();
        flux.on(PickImageReq::PATH, move |path, payload, _| {
            let ctx = ctx.clone();
            async move {
                let Some(req) = payload.downcast_ref::<PickImageReq>() else {
                    warn!(%path, "unexpected payload");
                    return;
                };
                let Some(composer) = ctx.composer() else {
                    debug!(%path, "add-post modal not open");
                    return;
                };
                match composer.pick_image(&req.path).await {
                    Ok(PickOutcome::Applied) => {
                        debug!(file = %req.path.display(), "image selected");
                    }
                    Ok(PickOutcome::Superseded) => {}
                    Err(e) => warn!(error = %e, "image selection failed"),
                }
            }
        });
    }

    // compose/update-caption
    {
        let ctx = ctx.clone();
        flux.on(UpdateCaptionReq::PATH, move |path, payload, _| {
            let ctx = ctx.clone();
            async move {
                let Some(req) = payload.downcast_ref::<UpdateCaptionReq>() else {
                    warn!(%path, "unexpected payload");
                    return;
                };
                match ctx.composer() {
                    Some(composer) => composer.set_caption(req.value.clone()),
                    None => debug!(%path, "add-post modal not open"),
                }
            }
        });
    }

    // compose/submit
    {
        let ctx = ctx.clone();
        flux.on(SubmitPostReq::PATH, move |path, _, store: Arc<StateStore>| {
            let ctx = ctx.clone();
            async move {
                let Some(composer) = ctx.composer() else {
                    debug!(%path, "add-post modal not open");
                    return;
                };
                // Failures are logged and recorded in ComposerState by the
                // composer itself.
                if let Ok(SubmitOutcome::Posted { post_id, image_url }) = composer.submit().await {
                    store.set(LastPost::PATH, LastPost { post_id, image_url });
                }
            }
        });
    }

    // pointer/down
    {
        let ctx = ctx.clone();
        flux.on(PointerDownReq::PATH, move |path, payload, _| {
            let ctx = ctx.clone();
            async move {
                let Some(req) = payload.downcast_ref::<PointerDownReq>() else {
                    warn!(%path, "unexpected payload");
                    return;
                };
                ctx.page.pointer_down(PointerEvent { target: req.target });
            }
        });
    }
}
