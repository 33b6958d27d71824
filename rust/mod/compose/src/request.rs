//! Requests the add-post modal handles.

use std::path::PathBuf;

use flux_derive::request;

use crate::dismiss::NodeId;

/// Open the add-post modal for the signed-in user.
#[request("modal/open-add-post")]
pub struct OpenAddPostReq;

/// Close the add-post modal.
#[request("modal/close-add-post")]
pub struct CloseAddPostReq;

/// A file was chosen in the picker.
#[request("compose/pick-image")]
pub struct PickImageReq {
    pub path: PathBuf,
}

/// The caption field changed.
#[request("compose/update-caption")]
pub struct UpdateCaptionReq {
    pub value: String,
}

/// The post button was pressed.
#[request("compose/submit")]
pub struct SubmitPostReq;

/// A pointer-down anywhere on the page.
#[request("pointer/down")]
pub struct PointerDownReq {
    pub target: NodeId,
}
