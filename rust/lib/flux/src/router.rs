use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use crate::store::StateStore;
use crate::topic::Pattern;

/// A boxed, `Send`-able future returned by request handlers.
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Type-erased request payload.
pub type Payload = Arc<dyn Any + Send + Sync>;

type ErasedHandler = Arc<dyn Fn(String, Payload, Arc<StateStore>) -> BoxFuture + Send + Sync>;

/// Request router: path patterns to async handlers.
///
/// Every handler whose pattern matches a dispatched path runs, one after
/// another, in registration order. A path nobody handles is a no-op.
pub struct Router {
    routes: RwLock<Vec<Route>>,
}

struct Route {
    pattern: Pattern,
    handler: ErasedHandler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(Vec::new()),
        }
    }

    /// Register an async handler for a path pattern (`+` and `#` allowed).
    pub fn on<F, Fut>(&self, pattern: &str, handler: F)
    where
        F: Fn(String, Payload, Arc<StateStore>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: ErasedHandler =
            Arc::new(move |path, payload, store| -> BoxFuture { Box::pin(handler(path, payload, store)) });
        self.routes.write().unwrap().push(Route {
            pattern: Pattern::parse(pattern),
            handler,
        });
    }

    /// Run every handler matching `path`, sequentially.
    pub async fn dispatch(&self, path: &str, payload: Payload, store: Arc<StateStore>) {
        // Never hold the lock across an await.
        let handlers: Vec<ErasedHandler> = self
            .routes
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.pattern.matches(path))
            .map(|r| Arc::clone(&r.handler))
            .collect();
        if handlers.is_empty() {
            tracing::debug!(path, "no handler for request");
            return;
        }
        for handler in handlers {
            handler(path.to_string(), Arc::clone(&payload), Arc::clone(&store)).await;
        }
    }

    /// Check if any handler would match the given path.
    pub fn matches(&self, path: &str) -> bool {
        self.routes
            .read()
            .unwrap()
            .iter()
            .any(|r| r.pattern.matches(path))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
