//! Flux states owned by the add-post modal.

use flux_derive::state;
use picpost_blob::DataUrl;

use crate::model::AuthenticatedUser;

/// Composer form state, published at `compose/add-post` while the modal
/// is mounted.
#[state("compose/add-post")]
pub struct ComposerState {
    pub caption: String,
    pub selected_image: Option<DataUrl>,
    /// A submission is in flight.
    pub busy: bool,
    /// Last submission failure. Cleared on edit.
    pub error: Option<String>,
}

impl ComposerState {
    pub fn empty() -> Self {
        Self {
            caption: String::new(),
            selected_image: None,
            busy: false,
            error: None,
        }
    }

    /// The post button is enabled only with an image and nothing in flight.
    pub fn can_submit(&self) -> bool {
        self.selected_image.is_some() && !self.busy
    }
}

impl Default for ComposerState {
    fn default() -> Self {
        Self::empty()
    }
}

/// Which modals the app shell shows. Stored at `app/modal`.
#[state("app/modal")]
#[derive(Default)]
pub struct ModalState {
    pub add_post_open: bool,
}

/// The post most recently published through the composer, stored at
/// `compose/last-post`. It outlives the modal.
#[state("compose/last-post")]
pub struct LastPost {
    pub post_id: String,
    pub image_url: String,
}

/// The signed-in session, written by the auth layer at `auth/session`.
#[state("auth/session")]
#[derive(Default)]
pub struct Session {
    pub user: Option<AuthenticatedUser>,
}
