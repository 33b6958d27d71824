//! The add-post composer.
//!
//! Submitting a post is four sequential external calls:
//!
//! 1. create the post document (identity, caption, server timestamp)
//! 2. upload the selected image under a key derived from the post id
//! 3. resolve the image's public URL
//! 4. patch the post document with that URL
//!
//! then the close signal fires. The caption is cleared as soon as step 1
//! succeeds. Each call is bounded by the configured step timeout, and the
//! busy flag is released on every exit path.

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};

use picpost_blob::{BlobStore, DataUrl};
use picpost_docs::DocumentStore;
use tracing::{debug, info, warn};

use crate::config::ComposerConfig;
use crate::dismiss::{ListenerGuard, NodeId, Page, install_outside_click};
use crate::error::{PickError, Step, StepFailure, SubmitError};
use crate::model::{AuthenticatedUser, PostRecord};
use crate::picker::{PickOutcome, PickSequence, PickTicket, read_data_url};
use crate::state::ComposerState;

/// Asks the parent container to close the composer.
pub type CloseSignal = Arc<dyn Fn() + Send + Sync>;

/// Called with a snapshot after every state change.
///
/// Runs while the composer's state lock is held, so it must not call
/// back into the composer.
pub type StateObserver = Arc<dyn Fn(&ComposerState) + Send + Sync>;

/// Result of a submit that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Posted { post_id: String, image_url: String },
    /// Another submission was already in flight; nothing was done.
    AlreadyInFlight,
}

/// What a submission captured from the form when it started.
struct Draft {
    caption: String,
    image: DataUrl,
}

pub struct PostComposer {
    user: AuthenticatedUser,
    docs: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    on_close: CloseSignal,
    config: ComposerConfig,
    state: Mutex<ComposerState>,
    picks: PickSequence,
    observer: Option<StateObserver>,
}

impl PostComposer {
    /// A composer always posts as a verified user.
    pub fn new(
        user: AuthenticatedUser,
        docs: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        on_close: CloseSignal,
        config: ComposerConfig,
    ) -> Self {
        Self {
            user,
            docs,
            blobs,
            on_close,
            config,
            state: Mutex::new(ComposerState::empty()),
            picks: PickSequence::new(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: StateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn user(&self) -> &AuthenticatedUser {
        &self.user
    }

    pub fn snapshot(&self) -> ComposerState {
        self.state.lock().unwrap().clone()
    }

    fn update<R>(&self, f: impl FnOnce(&mut ComposerState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        let out = f(&mut state);
        if let Some(observer) = &self.observer {
            observer(&state);
        }
        out
    }

    // ====================================================================
    // Form input
    // ====================================================================

    pub fn set_caption(&self, value: impl Into<String>) {
        let value = value.into();
        self.update(|s| {
            s.caption = value;
            s.error = None;
        });
    }

    /// Start a file selection. Any selection still being read becomes
    /// stale.
    pub fn begin_pick(&self) -> PickTicket {
        self.picks.issue()
    }

    /// Apply a finished read if its ticket is still the latest.
    pub fn finish_pick(&self, ticket: PickTicket, image: DataUrl) -> PickOutcome {
        self.update(|s| {
            // Checked under the state lock so two finishing reads can't
            // interleave between check and write.
            if !self.picks.is_latest(ticket) {
                debug!(?ticket, "discarding stale image read");
                return PickOutcome::Superseded;
            }
            s.selected_image = Some(image);
            s.error = None;
            PickOutcome::Applied
        })
    }

    /// Read `path` into a data URL and select it.
    pub async fn pick_image(&self, path: &Path) -> Result<PickOutcome, PickError> {
        let ticket = self.begin_pick();
        let image = read_data_url(path).await?;
        Ok(self.finish_pick(ticket, image))
    }

    // ====================================================================
    // Submission
    // ====================================================================

    /// Take the busy flag and capture the draft, or report why not.
    fn begin_submit(&self) -> Result<Option<(BusyGuard<'_>, Draft)>, SubmitError> {
        self.update(|s| {
            if s.busy {
                return Ok(None);
            }
            let image = match &s.selected_image {
                Some(image) if s.can_submit() => image.clone(),
                _ => {
                    let err = SubmitError::NoImage;
                    s.error = Some(err.to_string());
                    return Err(err);
                }
            };
            s.busy = true;
            s.error = None;
            let draft = Draft {
                caption: s.caption.clone(),
                image,
            };
            Ok(Some((BusyGuard { composer: self }, draft)))
        })
    }

    /// Post the selected image with the current caption.
    ///
    /// Calling this while a submission is in flight is a no-op that returns
    /// `AlreadyInFlight`. Every failure, including a missing image, is also
    /// recorded in `ComposerState::error`; the image stays selected for a
    /// retry.
    pub async fn submit(&self) -> Result<SubmitOutcome, SubmitError> {
        let started = self.begin_submit().inspect_err(|e| {
            warn!(error = %e, "submit rejected");
        })?;
        let Some((busy, draft)) = started else {
            debug!("submit ignored: already in flight");
            return Ok(SubmitOutcome::AlreadyInFlight);
        };

        let result = self.write_post(draft).await;
        match &result {
            Ok((post_id, _)) => {
                info!(post_id = %post_id, uid = %self.user.uid, "post published");
                self.update(|s| s.selected_image = None);
            }
            Err(e) => {
                warn!(error = %e, orphaned_post = ?e.orphaned_post_id(), "submit failed");
                let message = e.to_string();
                self.update(|s| s.error = Some(message));
            }
        }
        drop(busy);

        result.map(|(post_id, image_url)| SubmitOutcome::Posted { post_id, image_url })
    }

    async fn write_post(&self, draft: Draft) -> Result<(String, String), SubmitError> {
        let collection = self.config.collection.as_str();

        let post_id = self
            .run_step(
                Step::CreatePost,
                None,
                self.docs
                    .create_document(collection, PostRecord::draft_fields(&self.user, &draft.caption)),
            )
            .await?;
        self.update(|s| s.caption.clear());

        let key = self.config.image_key_for(&post_id);
        let receipt = self
            .run_step(
                Step::UploadImage,
                Some(&post_id),
                self.blobs.upload_data_url(&key, &draft.image),
            )
            .await?;
        debug!(key = %receipt.key, size = receipt.size, "image uploaded");

        let image_url = self
            .run_step(Step::ResolveUrl, Some(&post_id), self.blobs.public_url(&key))
            .await?;

        self.run_step(
            Step::AttachImage,
            Some(&post_id),
            self.docs
                .update_document(collection, &post_id, PostRecord::image_fields(&image_url)),
        )
        .await?;

        (self.on_close)();
        Ok((post_id, image_url))
    }

    async fn run_step<T, E, F>(&self, step: Step, post_id: Option<&str>, call: F) -> Result<T, SubmitError>
    where
        E: StepFailure,
        F: Future<Output = Result<T, E>>,
    {
        let timeout = self.config.step_timeout();
        debug!(%step, post_id, "submit step");
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.at(step, post_id)),
            Err(_) => Err(SubmitError::Timeout {
                step,
                post_id: post_id.map(str::to_string),
                timeout,
            }),
        }
    }

    // ====================================================================
    // Mounting
    // ====================================================================

    /// Install outside-click dismissal for the modal content at `content`.
    /// Dropping the guard unmounts it.
    pub fn mount(&self, page: &Arc<Page>, content: NodeId) -> ListenerGuard {
        install_outside_click(page, content, Arc::clone(&self.on_close))
    }
}

/// Holds the busy flag; releases it when dropped, including when a
/// submission fails, times out, or its future is dropped.
struct BusyGuard<'a> {
    composer: &'a PostComposer,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.composer.update(|s| s.busy = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use picpost_blob::{BlobError, MemoryBlobStore, UploadReceipt};
    use picpost_docs::{DocError, Document, FieldValue, Fields, MemoryDocStore};
    use tokio::sync::Notify;

    use crate::dismiss::{ElementTree, PointerEvent};
    use crate::model::field;

    // ========================================================================
    // Fakes
    // ========================================================================

    /// Ordered log of external calls and close signals.
    #[derive(Default)]
    struct Calls(Mutex<Vec<String>>);

    impl Calls {
        fn push(&self, call: String) {
            self.0.lock().unwrap().push(call);
        }

        fn take(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    /// Parks a call until the test releases it.
    #[derive(Default)]
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    impl Gate {
        async fn pass(&self) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }

    #[derive(Default)]
    struct Faults {
        gate_create: Option<Arc<Gate>>,
        gate_upload: Option<Arc<Gate>>,
        hang_upload: bool,
        fail_update: bool,
    }

    struct RecordingDocs {
        inner: MemoryDocStore,
        calls: Arc<Calls>,
        gate_create: Option<Arc<Gate>>,
        fail_update: bool,
    }

    #[async_trait]
    impl DocumentStore for RecordingDocs {
        async fn create_document(&self, collection: &str, fields: Fields) -> Result<String, DocError> {
            self.calls.push(format!("create:{collection}"));
            if let Some(gate) = &self.gate_create {
                gate.pass().await;
            }
            self.inner.create_document(collection, fields).await
        }

        async fn update_document(&self, collection: &str, id: &str, fields: Fields) -> Result<(), DocError> {
            self.calls.push(format!("update:{collection}/{id}"));
            if self.fail_update {
                return Err(DocError::Storage("quota exceeded".into()));
            }
            self.inner.update_document(collection, id, fields).await
        }

        async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, DocError> {
            self.inner.get_document(collection, id).await
        }

        async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, DocError> {
            self.inner.list_documents(collection).await
        }

        async fn delete_document(&self, collection: &str, id: &str) -> Result<(), DocError> {
            self.inner.delete_document(collection, id).await
        }
    }

    struct RecordingBlobs {
        inner: MemoryBlobStore,
        calls: Arc<Calls>,
        gate_upload: Option<Arc<Gate>>,
        hang_upload: bool,
    }

    #[async_trait]
    impl BlobStore for RecordingBlobs {
        async fn upload_data_url(&self, key: &str, data: &DataUrl) -> Result<UploadReceipt, BlobError> {
            self.calls.push(format!("upload:{key}"));
            if let Some(gate) = &self.gate_upload {
                gate.pass().await;
            }
            if self.hang_upload {
                std::future::pending::<()>().await;
            }
            self.inner.upload_data_url(key, data).await
        }

        async fn public_url(&self, key: &str) -> Result<String, BlobError> {
            self.calls.push(format!("url:{key}"));
            self.inner.public_url(key).await
        }

        async fn delete(&self, key: &str) -> Result<(), BlobError> {
            self.inner.delete(key).await
        }
    }

    struct Harness {
        composer: Arc<PostComposer>,
        docs: Arc<RecordingDocs>,
        blobs: Arc<RecordingBlobs>,
        calls: Arc<Calls>,
        closes: Arc<AtomicU32>,
    }

    fn alice() -> AuthenticatedUser {
        AuthenticatedUser {
            display_name: "alice".into(),
            uid: "u1".into(),
            photo_url: Some("p.jpg".into()),
        }
    }

    fn image() -> DataUrl {
        DataUrl::from_bytes("image/png", b"\x89PNG\r\n")
    }

    fn harness(faults: Faults) -> Harness {
        harness_with(faults, None)
    }

    fn harness_with(faults: Faults, observer: Option<StateObserver>) -> Harness {
        let calls = Arc::new(Calls::default());
        let closes = Arc::new(AtomicU32::new(0));
        let docs = Arc::new(RecordingDocs {
            inner: MemoryDocStore::new(),
            calls: calls.clone(),
            gate_create: faults.gate_create,
            fail_update: faults.fail_update,
        });
        let blobs = Arc::new(RecordingBlobs {
            inner: MemoryBlobStore::new(),
            calls: calls.clone(),
            gate_upload: faults.gate_upload,
            hang_upload: faults.hang_upload,
        });
        let on_close: CloseSignal = {
            let (calls, closes) = (calls.clone(), closes.clone());
            Arc::new(move || {
                calls.push("close".into());
                closes.fetch_add(1, Ordering::SeqCst);
            })
        };
        let config = ComposerConfig {
            step_timeout_ms: 1_000,
            ..ComposerConfig::default()
        };
        let mut composer = PostComposer::new(alice(), docs.clone(), blobs.clone(), on_close, config);
        if let Some(observer) = observer {
            composer = composer.with_observer(observer);
        }
        Harness {
            composer: Arc::new(composer),
            docs,
            blobs,
            calls,
            closes,
        }
    }

    fn select(composer: &PostComposer, image: DataUrl) {
        let ticket = composer.begin_pick();
        assert_eq!(composer.finish_pick(ticket, image), PickOutcome::Applied);
    }

    // ========================================================================
    // Happy path
    // ========================================================================

    #[tokio::test]
    async fn end_to_end_creates_uploads_and_attaches() {
        let h = harness(Faults::default());
        h.composer.set_caption("hello");
        select(&h.composer, image());

        let outcome = h.composer.submit().await.unwrap();

        let SubmitOutcome::Posted { post_id, image_url } = outcome else {
            panic!("expected a post, got {outcome:?}");
        };
        let key = format!("posts/{post_id}/image");
        assert_eq!(image_url, format!("memory://{key}"));

        let doc = h.docs.get_document("posts", &post_id).await.unwrap().unwrap();
        assert_eq!(doc.get_str(field::USERNAME), Some("alice"));
        assert_eq!(doc.get_str(field::USER_ID), Some("u1"));
        assert_eq!(doc.get_str(field::CAPTION), Some("hello"));
        assert_eq!(doc.get_str(field::PROFILE_IMG), Some("p.jpg"));
        assert!(matches!(doc.get(field::TIMESTAMP), Some(FieldValue::Timestamp(_))));
        assert_eq!(doc.get_str(field::IMAGE), Some(image_url.as_str()));

        let stored = h.blobs.inner.get(&key).unwrap();
        assert_eq!(stored.data, b"\x89PNG\r\n");
        assert_eq!(stored.content_type, "image/png");
    }

    #[tokio::test]
    async fn calls_run_strictly_in_sequence() {
        let h = harness(Faults::default());
        select(&h.composer, image());

        let SubmitOutcome::Posted { post_id, .. } = h.composer.submit().await.unwrap() else {
            panic!("expected a post");
        };

        assert_eq!(
            h.calls.take(),
            vec![
                "create:posts".to_string(),
                format!("upload:posts/{post_id}/image"),
                format!("url:posts/{post_id}/image"),
                format!("update:posts/{post_id}"),
                "close".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn success_resets_state_and_closes_once() {
        let h = harness(Faults::default());
        h.composer.set_caption("hello");
        select(&h.composer, image());

        h.composer.submit().await.unwrap();

        let state = h.composer.snapshot();
        assert_eq!(state.caption, "");
        assert!(state.selected_image.is_none());
        assert!(!state.busy);
        assert!(state.error.is_none());
        assert_eq!(h.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn observer_sees_busy_rise_and_fall() {
        let seen = Arc::new(Mutex::new(Vec::<bool>::new()));
        let s = seen.clone();
        let h = harness_with(
            Faults::default(),
            Some(Arc::new(move |state: &ComposerState| {
                s.lock().unwrap().push(state.busy);
            })),
        );
        select(&h.composer, image());
        seen.lock().unwrap().clear();

        h.composer.submit().await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&true));
        assert_eq!(seen.last(), Some(&false));
        assert_eq!(seen.iter().filter(|b| !**b).count(), 1);
    }

    // ========================================================================
    // Busy guard
    // ========================================================================

    #[tokio::test]
    async fn submit_while_busy_is_a_noop() {
        let gate = Arc::new(Gate::default());
        let h = harness(Faults {
            gate_create: Some(gate.clone()),
            ..Faults::default()
        });
        select(&h.composer, image());

        let first = {
            let composer = h.composer.clone();
            tokio::spawn(async move { composer.submit().await })
        };
        gate.entered.notified().await;
        assert!(h.composer.snapshot().busy);

        let second = h.composer.submit().await.unwrap();
        assert_eq!(second, SubmitOutcome::AlreadyInFlight);
        assert_eq!(h.calls.take(), vec!["create:posts".to_string()]);

        gate.release.notify_one();
        assert!(matches!(
            first.await.unwrap().unwrap(),
            SubmitOutcome::Posted { .. }
        ));
        assert_eq!(h.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn caption_clears_once_post_exists() {
        let gate = Arc::new(Gate::default());
        let h = harness(Faults {
            gate_upload: Some(gate.clone()),
            ..Faults::default()
        });
        h.composer.set_caption("hello");
        select(&h.composer, image());

        let task = {
            let composer = h.composer.clone();
            tokio::spawn(async move { composer.submit().await })
        };
        gate.entered.notified().await;

        let mid = h.composer.snapshot();
        assert_eq!(mid.caption, "");
        assert!(mid.busy);
        assert!(mid.selected_image.is_some());

        gate.release.notify_one();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn dropped_submission_releases_busy() {
        let gate = Arc::new(Gate::default());
        let h = harness(Faults {
            gate_create: Some(gate.clone()),
            ..Faults::default()
        });
        select(&h.composer, image());

        let task = {
            let composer = h.composer.clone();
            tokio::spawn(async move { composer.submit().await })
        };
        gate.entered.notified().await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert!(!h.composer.snapshot().busy);
        assert_eq!(h.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn submit_without_image_touches_nothing() {
        let h = harness(Faults::default());
        h.composer.set_caption("words only");

        let err = h.composer.submit().await.unwrap_err();

        assert!(matches!(err, SubmitError::NoImage));
        assert!(h.calls.take().is_empty());
        let state = h.composer.snapshot();
        assert!(!state.busy);
        assert_eq!(state.error.as_deref(), Some("no image selected"));
        assert_eq!(state.caption, "words only");
    }

    // ========================================================================
    // Failures
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn hung_upload_times_out_and_releases_busy() {
        let h = harness(Faults {
            hang_upload: true,
            ..Faults::default()
        });
        h.composer.set_caption("hello");
        select(&h.composer, image());

        let err = h.composer.submit().await.unwrap_err();

        let SubmitError::Timeout { step, post_id, timeout } = &err else {
            panic!("expected timeout, got {err:?}");
        };
        assert_eq!(*step, Step::UploadImage);
        assert_eq!(*timeout, std::time::Duration::from_secs(1));
        let post_id = post_id.clone().unwrap();

        let state = h.composer.snapshot();
        assert!(!state.busy);
        assert_eq!(state.caption, "");
        assert!(state.selected_image.is_some());
        assert!(state.error.as_deref().unwrap().contains("upload image timed out"));
        assert_eq!(h.closes.load(Ordering::SeqCst), 0);

        let doc = h.docs.get_document("posts", &post_id).await.unwrap().unwrap();
        assert!(doc.get(field::IMAGE).is_none());
    }

    #[tokio::test]
    async fn patch_failure_reports_orphaned_post() {
        let h = harness(Faults {
            fail_update: true,
            ..Faults::default()
        });
        select(&h.composer, image());

        let err = h.composer.submit().await.unwrap_err();

        assert_eq!(err.step(), Some(Step::AttachImage));
        let orphan = err.orphaned_post_id().unwrap().to_string();
        let doc = h.docs.get_document("posts", &orphan).await.unwrap().unwrap();
        assert!(doc.get(field::IMAGE).is_none());
        assert!(!h.composer.snapshot().busy);
        assert_eq!(h.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn retry_after_failure_can_succeed() {
        let h = harness(Faults {
            fail_update: true,
            ..Faults::default()
        });
        select(&h.composer, image());
        assert!(h.composer.submit().await.is_err());

        h.composer.set_caption("second try");
        assert!(h.composer.snapshot().error.is_none());
        assert!(h.composer.submit().await.is_err());
        assert!(!h.composer.snapshot().busy);
    }

    // ========================================================================
    // Image selection
    // ========================================================================

    #[test]
    fn later_selection_wins_when_earlier_read_finishes_last() {
        let h = harness(Faults::default());
        let a = h.composer.begin_pick();
        let b = h.composer.begin_pick();
        let img_a = DataUrl::from_bytes("image/png", b"A");
        let img_b = DataUrl::from_bytes("image/png", b"B");

        assert_eq!(h.composer.finish_pick(b, img_b.clone()), PickOutcome::Applied);
        assert_eq!(h.composer.finish_pick(a, img_a), PickOutcome::Superseded);

        assert_eq!(h.composer.snapshot().selected_image, Some(img_b));
    }

    #[test]
    fn later_selection_wins_when_earlier_read_finishes_first() {
        let h = harness(Faults::default());
        let a = h.composer.begin_pick();
        let b = h.composer.begin_pick();
        let img_b = DataUrl::from_bytes("image/png", b"B");

        assert_eq!(
            h.composer.finish_pick(a, DataUrl::from_bytes("image/png", b"A")),
            PickOutcome::Superseded
        );
        assert_eq!(h.composer.finish_pick(b, img_b.clone()), PickOutcome::Applied);

        assert_eq!(h.composer.snapshot().selected_image, Some(img_b));
    }

    #[tokio::test]
    async fn pick_image_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beach.jpg");
        std::fs::write(&path, b"\xff\xd8\xff").unwrap();
        let h = harness(Faults::default());

        assert_eq!(h.composer.pick_image(&path).await.unwrap(), PickOutcome::Applied);

        let selected = h.composer.snapshot().selected_image.unwrap();
        assert_eq!(selected.mime(), "image/jpeg");
        assert_eq!(selected.decode().unwrap(), b"\xff\xd8\xff");
    }

    #[tokio::test]
    async fn failed_read_keeps_previous_image() {
        let h = harness(Faults::default());
        select(&h.composer, image());

        assert!(h.composer.pick_image(Path::new("/no/such/file.png")).await.is_err());
        assert_eq!(h.composer.snapshot().selected_image, Some(image()));
    }

    // ========================================================================
    // Mounting
    // ========================================================================

    #[test]
    fn mounted_composer_closes_on_outside_click_only() {
        let h = harness(Faults::default());
        let mut tree = ElementTree::new();
        let backdrop = tree.append(tree.root());
        let content = tree.append(backdrop);
        let button = tree.append(content);
        let page = Page::new(tree);

        let guard = h.composer.mount(&page, content);
        page.pointer_down(PointerEvent { target: button });
        assert_eq!(h.closes.load(Ordering::SeqCst), 0);
        page.pointer_down(PointerEvent { target: backdrop });
        assert_eq!(h.closes.load(Ordering::SeqCst), 1);

        drop(guard);
        page.pointer_down(PointerEvent { target: backdrop });
        assert_eq!(h.closes.load(Ordering::SeqCst), 1);
    }
}
