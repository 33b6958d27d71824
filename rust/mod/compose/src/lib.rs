//! Add-post modal: the composer that turns an image and a caption into a
//! post record.
//!
//! [`PostComposer`] owns the form state and the submit sequence.
//! [`register_handlers`] exposes it over Flux: requests such as
//! `compose/submit` drive it, and its state is published at
//! `compose/add-post` while the modal is open.

pub mod composer;
pub mod config;
pub mod dismiss;
pub mod error;
pub mod handlers;
pub mod model;
pub mod picker;
pub mod request;
pub mod state;

pub use composer::{CloseSignal, PostComposer, StateObserver, SubmitOutcome};
pub use config::{ComposerConfig, ConfigError};
pub use dismiss::{ElementTree, ListenerGuard, NodeId, Page, PointerEvent, install_outside_click};
pub use error::{PickError, Step, SubmitError};
pub use handlers::{ComposeContext, register_handlers};
pub use model::{AuthenticatedUser, PostRecord};
pub use picker::{PickOutcome, PickTicket};
pub use request::*;
pub use state::{ComposerState, LastPost, ModalState, Session};
