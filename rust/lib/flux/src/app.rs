use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use crate::router::{Payload, Router};
use crate::store::StateStore;
use crate::value::{StateValue, SubscriptionId};

/// Flux: state store plus request router behind one handle.
///
/// - `get(path)` reads state
/// - `emit(path, payload)` routes a request to its handler(s)
/// - `subscribe(pattern)` observes state changes
///
/// ```ignore
/// let flux = Flux::new();
/// flux.on("modal/open-add-post", |_, _, store| async move {
///     store.set("app/modal", ModalState { add_post_open: true });
/// });
/// flux.subscribe("app/modal", |_, v| render(v));
/// flux.emit("modal/open-add-post", ()).await;
/// ```
pub struct Flux {
    store: Arc<StateStore>,
    router: Router,
}

impl Flux {
    pub fn new() -> Self {
        Self {
            store: Arc::new(StateStore::new()),
            router: Router::new(),
        }
    }

    pub fn get(&self, path: &str) -> Option<StateValue> {
        self.store.get(path)
    }

    /// Read and clone the state at `path` as `T`.
    pub fn get_as<T: Any + Clone>(&self, path: &str) -> Option<T> {
        self.store.get_as(path)
    }

    /// Emit a request and wait for its handler(s) to finish.
    pub async fn emit<T: Any + Send + Sync>(&self, path: &str, payload: T) {
        self.emit_arc(path, Arc::new(payload)).await;
    }

    pub async fn emit_arc(&self, path: &str, payload: Payload) {
        self.router
            .dispatch(path, payload, Arc::clone(&self.store))
            .await;
    }

    /// Register an async request handler. See [`Router::on`].
    pub fn on<F, Fut>(&self, pattern: &str, handler: F)
    where
        F: Fn(String, Payload, Arc<StateStore>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.router.on(pattern, handler);
    }

    pub fn has_handler(&self, path: &str) -> bool {
        self.router.matches(path)
    }

    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&str, &StateValue) + Send + Sync + 'static,
    {
        self.store.subscribe(pattern, handler)
    }

    pub fn unsubscribe(&self, pattern: &str, id: SubscriptionId) -> bool {
        self.store.unsubscribe(pattern, id)
    }

    /// Direct store access, for handlers wired outside `on` and for tests.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }
}

impl Default for Flux {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct ModalState {
        add_post_open: bool,
    }

    #[tokio::test]
    async fn emit_updates_state_and_notifies() {
        let flux = Flux::new();
        let renders = Arc::new(Mutex::new(Vec::new()));
        let r = renders.clone();

        flux.on("modal/open-add-post", |_, _, store: Arc<StateStore>| async move {
            store.set("app/modal", ModalState { add_post_open: true });
        });
        flux.on("modal/close-add-post", |_, _, store: Arc<StateStore>| async move {
            store.set("app/modal", ModalState { add_post_open: false });
        });
        flux.subscribe("app/modal", move |_, v| {
            r.lock()
                .unwrap()
                .push(v.downcast_ref::<ModalState>().unwrap().add_post_open);
        });

        flux.emit("modal/open-add-post", ()).await;
        flux.emit("modal/close-add-post", ()).await;

        assert_eq!(*renders.lock().unwrap(), vec![true, false]);
        assert_eq!(
            flux.get_as::<ModalState>("app/modal"),
            Some(ModalState { add_post_open: false })
        );
    }

    #[tokio::test]
    async fn emit_without_handler_is_silent() {
        let flux = Flux::new();
        flux.emit("nobody/listens", 1u8).await;
        assert!(flux.get("nobody/listens").is_none());
    }

    #[tokio::test]
    async fn handler_read_modify_write() {
        let flux = Flux::new();
        flux.store().set("counter", 0u32);
        flux.on("increment", |_, _, store: Arc<StateStore>| async move {
            let n = store.get_as::<u32>("counter").unwrap_or(0);
            store.set("counter", n + 1);
        });

        for _ in 0..3 {
            flux.emit("increment", ()).await;
        }
        assert_eq!(flux.get_as::<u32>("counter"), Some(3));
    }

    #[test]
    fn has_handler_follows_patterns() {
        let flux = Flux::new();
        flux.on("compose/+", |_, _, _| async {});
        assert!(flux.has_handler("compose/submit"));
        assert!(!flux.has_handler("compose"));
    }

    fn _assert_flux_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Flux>();
    }
}
