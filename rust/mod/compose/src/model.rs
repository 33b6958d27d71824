//! Post record and the signed-in user it is attributed to.

use picpost_docs::{Document, FieldValue, Fields};
use serde::{Deserialize, Serialize};

/// Field names of a post document.
pub mod field {
    pub const USERNAME: &str = "username";
    pub const USER_ID: &str = "userId";
    pub const CAPTION: &str = "caption";
    pub const PROFILE_IMG: &str = "profileImg";
    pub const TIMESTAMP: &str = "timestamp";
    pub const IMAGE: &str = "image";
}

/// The verified user a composer posts as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub display_name: String,
    pub uid: String,
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// A post as stored in the `posts` collection.
///
/// `image` is `None` between the create and the patch that attaches the
/// uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub id: String,
    pub username: String,
    pub user_id: String,
    pub caption: String,
    pub profile_img: Option<String>,
    pub timestamp: Option<String>,
    pub image: Option<String>,
}

impl PostRecord {
    /// Fields written on create: everything but `image`, with a
    /// server-assigned timestamp.
    pub fn draft_fields(user: &AuthenticatedUser, caption: &str) -> Fields {
        let profile_img = match &user.photo_url {
            Some(url) => FieldValue::from(url.as_str()),
            None => FieldValue::Null,
        };
        picpost_docs::fields([
            (field::USERNAME, user.display_name.as_str().into()),
            (field::USER_ID, user.uid.as_str().into()),
            (field::CAPTION, caption.into()),
            (field::PROFILE_IMG, profile_img),
            (field::TIMESTAMP, FieldValue::ServerTimestamp),
        ])
    }

    /// Fields written once the image URL is known.
    pub fn image_fields(url: &str) -> Fields {
        picpost_docs::fields([(field::IMAGE, url.into())])
    }

    /// Read a post back from its document. `None` if required fields are
    /// missing.
    pub fn from_document(doc: &Document) -> Option<Self> {
        Some(Self {
            id: doc.id.clone(),
            username: doc.get_str(field::USERNAME)?.to_string(),
            user_id: doc.get_str(field::USER_ID)?.to_string(),
            caption: doc.get_str(field::CAPTION)?.to_string(),
            profile_img: doc.get_str(field::PROFILE_IMG).map(str::to_string),
            timestamp: doc.get_str(field::TIMESTAMP).map(str::to_string),
            image: doc.get_str(field::IMAGE).map(str::to_string),
        })
    }
}
