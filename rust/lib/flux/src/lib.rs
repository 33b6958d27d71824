//! Flux: path-addressed state store and request router.
//!
//! The UI layer never mutates state directly. It emits requests to
//! paths (`compose/submit`), handlers update state at paths
//! (`compose/add-post`, `app/modal`), and views subscribe to the paths
//! they render.
//!
//! Patterns use `/` separated levels with MQTT-style wildcards:
//! `+` matches one level, `#` matches the rest.

pub mod app;
pub mod router;
pub mod store;
pub mod topic;
pub mod value;

pub use app::Flux;
pub use router::{BoxFuture, Payload, Router};
pub use store::{ChangeHandler, StateStore};
pub use topic::Pattern;
pub use value::{StateValue, SubscriptionId};
