use std::fmt;
use std::time::Duration;

use picpost_blob::BlobError;
use picpost_docs::DocError;
use thiserror::Error;

/// The external call a submission was making when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CreatePost,
    UploadImage,
    ResolveUrl,
    AttachImage,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::CreatePost => "create post",
            Step::UploadImage => "upload image",
            Step::ResolveUrl => "resolve image URL",
            Step::AttachImage => "attach image",
        })
    }
}

/// Why a submission did not complete.
///
/// Failures after `CreatePost` carry the id of the post that now exists
/// without an image; nothing is rolled back.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("no image selected")]
    NoImage,

    #[error("{step} timed out after {timeout:?}")]
    Timeout {
        step: Step,
        post_id: Option<String>,
        timeout: Duration,
    },

    #[error("{step} failed: {source}")]
    Document {
        step: Step,
        post_id: Option<String>,
        #[source]
        source: DocError,
    },

    #[error("{step} failed: {source}")]
    Blob {
        step: Step,
        post_id: Option<String>,
        #[source]
        source: BlobError,
    },
}

impl SubmitError {
    /// The step that failed, if the failure came from an external call.
    pub fn step(&self) -> Option<Step> {
        match self {
            SubmitError::NoImage => None,
            SubmitError::Timeout { step, .. }
            | SubmitError::Document { step, .. }
            | SubmitError::Blob { step, .. } => Some(*step),
        }
    }

    /// Id of a post record created before the failure.
    pub fn orphaned_post_id(&self) -> Option<&str> {
        match self {
            SubmitError::NoImage => None,
            SubmitError::Timeout { post_id, .. }
            | SubmitError::Document { post_id, .. }
            | SubmitError::Blob { post_id, .. } => post_id.as_deref(),
        }
    }
}

/// Converts a collaborator error into a `SubmitError` for a given step.
pub(crate) trait StepFailure {
    fn at(self, step: Step, post_id: Option<&str>) -> SubmitError;
}

impl StepFailure for DocError {
    fn at(self, step: Step, post_id: Option<&str>) -> SubmitError {
        SubmitError::Document {
            step,
            post_id: post_id.map(str::to_string),
            source: self,
        }
    }
}

impl StepFailure for BlobError {
    fn at(self, step: Step, post_id: Option<&str>) -> SubmitError {
        SubmitError::Blob {
            step,
            post_id: post_id.map(str::to_string),
            source: self,
        }
    }
}

/// Reading a picked file failed.
#[derive(Error, Debug)]
pub enum PickError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_step() {
        let err = BlobError::NotFound("posts/p1/image".into()).at(Step::ResolveUrl, Some("p1"));
        assert_eq!(
            err.to_string(),
            "resolve image URL failed: blob not found: posts/p1/image"
        );
        assert_eq!(err.step(), Some(Step::ResolveUrl));
        assert_eq!(err.orphaned_post_id(), Some("p1"));
    }

    #[test]
    fn create_failure_has_no_orphan() {
        let err = DocError::Storage("disk full".into()).at(Step::CreatePost, None);
        assert_eq!(err.orphaned_post_id(), None);
        assert!(SubmitError::NoImage.step().is_none());
    }
}
