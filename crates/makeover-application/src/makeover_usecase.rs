//! Makeover use case implementation.
//!
//! `MakeoverUseCase` owns the [`CompositionController`] behind an async lock
//! and runs backend calls outside of it, so slot edits and undo/redo stay
//! available while a request is in flight. Every state change is published
//! as a [`CompositionSnapshot`] on a watch channel.

use makeover_core::backend::ImageBackend;
use makeover_core::controller::CompositionController;
use makeover_core::error::{MakeoverError, Result};
use makeover_core::image::ImageRef;
use makeover_core::orchestrator::{CompletionOutcome, PendingRequest};
use makeover_core::snapshot::CompositionSnapshot;
use makeover_infrastructure::image_files;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Use case coordinating the composition engine, the backend and the files.
///
/// # Concurrency
///
/// Intents take the controller lock only for the synchronous state change.
/// A started request is executed on a spawned task that reacquires the lock
/// to deliver its result; results for an abandoned session are discarded by
/// the controller.
#[derive(Clone)]
pub struct MakeoverUseCase {
    controller: Arc<RwLock<CompositionController>>,
    backend: Arc<dyn ImageBackend>,
    snapshots: Arc<watch::Sender<CompositionSnapshot>>,
    /// Default target of `download`.
    output_dir: PathBuf,
}

impl MakeoverUseCase {
    pub fn new(backend: Arc<dyn ImageBackend>, output_dir: impl Into<PathBuf>) -> Self {
        let controller = CompositionController::new();
        let (snapshots, _) = watch::channel(controller.snapshot());
        Self {
            controller: Arc::new(RwLock::new(controller)),
            backend,
            snapshots: Arc::new(snapshots),
            output_dir: output_dir.into(),
        }
    }

    /// Receives a new snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<CompositionSnapshot> {
        self.snapshots.subscribe()
    }

    pub async fn snapshot(&self) -> CompositionSnapshot {
        self.controller.read().await.snapshot()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    // ============================================================================
    // Slots
    // ============================================================================

    /// Replaces all slots with the given images. Returns how many were placed.
    pub async fn upload_images(&self, images: Vec<ImageRef>) -> usize {
        self.mutate(|controller| controller.initial_upload(images))
            .await
    }

    /// Reads the files and replaces all slots with them.
    ///
    /// Nothing changes if any file cannot be read.
    pub async fn upload_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<usize> {
        let images = image_files::load_images(paths).await?;
        Ok(self.upload_images(images).await)
    }

    pub async fn set_slot(&self, index: usize, image: ImageRef) -> Result<()> {
        self.mutate(|controller| controller.update_slot(index, image))
            .await
    }

    pub async fn set_slot_from_file(&self, index: usize, path: &Path) -> Result<()> {
        let image = image_files::load_image(path).await?;
        self.set_slot(index, image).await
    }

    pub async fn remove_slot(&self, index: usize) -> Result<()> {
        self.mutate(|controller| controller.remove_slot(index))
            .await
    }

    // ============================================================================
    // Generation
    // ============================================================================

    /// Starts a full generation in the background.
    ///
    /// Validation and busy rejections are returned immediately; the handle
    /// resolves once the backend result has been delivered.
    pub async fn start_generate(&self) -> Result<JoinHandle<CompletionOutcome>> {
        let pending = self
            .mutate(|controller| controller.begin_generate())
            .await?;
        Ok(self.spawn_request(pending))
    }

    /// Starts an edit of the displayed artifact in the background.
    pub async fn start_edit(&self, instruction: &str) -> Result<JoinHandle<CompletionOutcome>> {
        let pending = self
            .mutate(|controller| controller.begin_edit(instruction))
            .await?;
        Ok(self.spawn_request(pending))
    }

    /// Runs a full generation to completion.
    pub async fn generate(&self) -> Result<CompletionOutcome> {
        join_request(self.start_generate().await?).await
    }

    /// Runs an edit to completion.
    pub async fn apply_edit(&self, instruction: &str) -> Result<CompletionOutcome> {
        join_request(self.start_edit(instruction).await?).await
    }

    pub async fn dismiss_error(&self) {
        self.mutate(CompositionController::dismiss_error).await
    }

    // ============================================================================
    // History and session
    // ============================================================================

    pub async fn undo(&self) -> bool {
        self.mutate(CompositionController::undo).await
    }

    pub async fn redo(&self) -> bool {
        self.mutate(CompositionController::redo).await
    }

    pub async fn start_over(&self) {
        self.mutate(CompositionController::start_over).await
    }

    pub async fn reuse_result_as_reference(&self) -> Result<()> {
        self.mutate(CompositionController::reuse_result_as_reference)
            .await
    }

    /// Writes the displayed artifact to `dir`, or to the configured output
    /// directory. Returns the written path.
    pub async fn download(&self, dir: Option<&Path>) -> Result<PathBuf> {
        let artifact = self.controller.read().await.artifact_for_download()?;
        let dir = dir.unwrap_or(&self.output_dir);
        image_files::save_artifact(&artifact, dir).await
    }

    /// Applies a synchronous change and publishes the resulting snapshot.
    async fn mutate<T>(&self, change: impl FnOnce(&mut CompositionController) -> T) -> T {
        let mut controller = self.controller.write().await;
        let output = change(&mut controller);
        self.snapshots.send_replace(controller.snapshot());
        output
    }

    fn spawn_request(&self, pending: PendingRequest) -> JoinHandle<CompletionOutcome> {
        let controller = Arc::clone(&self.controller);
        let backend = Arc::clone(&self.backend);
        let snapshots = Arc::clone(&self.snapshots);
        let PendingRequest { ticket, request } = pending;
        let span = tracing::info_span!(
            "makeover_request",
            request_id = ticket.request_id,
            session = ticket.session.0,
            kind = ?ticket.kind
        );

        tokio::spawn(
            async move {
                let result = request.execute(backend.as_ref()).await;
                let mut controller = controller.write().await;
                let outcome = controller.complete(ticket, result);
                snapshots.send_replace(controller.snapshot());
                tracing::debug!(?outcome, "Request completed");
                outcome
            }
            .instrument(span),
        )
    }
}

async fn join_request(handle: JoinHandle<CompletionOutcome>) -> Result<CompletionOutcome> {
    handle
        .await
        .map_err(|e| MakeoverError::internal(format!("Generation task failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use makeover_core::image::Artifact;
    use makeover_core::orchestrator::{MISSING_PORTRAIT_MESSAGE, OrchestratorState};
    use makeover_core::slot::{GenerationInputs, PORTRAIT_SLOT, VIBE_SLOT};
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;
    use tokio::sync::{Mutex, mpsc};

    /// Backend answering each call with the next scripted result.
    struct ScriptedBackend {
        responses: Mutex<mpsc::UnboundedReceiver<Result<Artifact>>>,
        instructions: StdMutex<Vec<String>>,
        composite_calls: StdMutex<Vec<usize>>,
    }

    impl ScriptedBackend {
        fn new() -> (Arc<Self>, mpsc::UnboundedSender<Result<Artifact>>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let backend = Arc::new(Self {
                responses: Mutex::new(rx),
                instructions: StdMutex::new(Vec::new()),
                composite_calls: StdMutex::new(Vec::new()),
            });
            (backend, tx)
        }

        async fn next(&self) -> Result<Artifact> {
            self.responses
                .lock()
                .await
                .recv()
                .await
                .unwrap_or_else(|| Err(MakeoverError::backend("script exhausted")))
        }
    }

    #[async_trait]
    impl ImageBackend for ScriptedBackend {
        async fn generate_composite(&self, inputs: &GenerationInputs) -> Result<Artifact> {
            self.composite_calls
                .lock()
                .unwrap()
                .push(inputs.image_count());
            self.next().await
        }

        async fn generate_adjustment(&self, _source: &ImageRef, instruction: &str) -> Result<Artifact> {
            self.instructions
                .lock()
                .unwrap()
                .push(instruction.to_string());
            self.next().await
        }
    }

    fn image(name: &str) -> ImageRef {
        ImageRef::new(name, "image/png", name.as_bytes().to_vec())
    }

    fn artifact(tag: u8) -> Artifact {
        Artifact::new("image/png", vec![tag])
    }

    fn usecase(output_dir: &Path) -> (MakeoverUseCase, Arc<ScriptedBackend>, mpsc::UnboundedSender<Result<Artifact>>) {
        let (backend, responses) = ScriptedBackend::new();
        let usecase = MakeoverUseCase::new(backend.clone(), output_dir);
        (usecase, backend, responses)
    }

    #[tokio::test]
    async fn test_generate_then_edit_builds_history() {
        let temp_dir = TempDir::new().unwrap();
        let (usecase, backend, responses) = usecase(temp_dir.path());
        usecase
            .upload_images(vec![image("p"), image("e1"), image("e2")])
            .await;

        responses.send(Ok(artifact(1))).unwrap();
        let outcome = usecase.generate().await.unwrap();
        assert_eq!(outcome, CompletionOutcome::Applied { cursor: 0, discarded: 0 });
        assert_eq!(*backend.composite_calls.lock().unwrap(), vec![3]);

        responses.send(Ok(artifact(2))).unwrap();
        let outcome = usecase.apply_edit("  warmer light ").await.unwrap();
        assert_eq!(outcome, CompletionOutcome::Applied { cursor: 1, discarded: 0 });
        // Sent untrimmed
        assert_eq!(*backend.instructions.lock().unwrap(), vec!["  warmer light ".to_string()]);

        let snapshot = usecase.snapshot().await;
        assert_eq!(snapshot.history_len, 2);
        assert_eq!(snapshot.cursor, Some(1));
        assert!(snapshot.can_undo);
        assert!(!snapshot.is_dirty);
    }

    #[tokio::test]
    async fn test_validation_is_reported_before_any_backend_call() {
        let temp_dir = TempDir::new().unwrap();
        let (usecase, backend, _responses) = usecase(temp_dir.path());

        let err = usecase.start_generate().await.unwrap_err();
        assert_eq!(err, MakeoverError::validation(MISSING_PORTRAIT_MESSAGE));
        assert!(usecase.start_edit("anything").await.unwrap_err().is_validation());
        assert!(backend.composite_calls.lock().unwrap().is_empty());
        assert_eq!(usecase.snapshot().await.state, OrchestratorState::Idle);
    }

    #[tokio::test]
    async fn test_intents_while_in_flight() {
        let temp_dir = TempDir::new().unwrap();
        let (usecase, _backend, responses) = usecase(temp_dir.path());
        usecase.upload_images(vec![image("p")]).await;
        responses.send(Ok(artifact(1))).unwrap();
        usecase.generate().await.unwrap();
        responses.send(Ok(artifact(2))).unwrap();
        usecase.apply_edit("first").await.unwrap();

        let handle = usecase.start_edit("second").await.unwrap();
        assert!(usecase.snapshot().await.is_loading);
        assert!(usecase.start_generate().await.unwrap_err().is_busy());
        assert!(usecase.start_edit("third").await.unwrap_err().is_busy());
        assert!(usecase.download(None).await.unwrap_err().is_busy());

        // Slot edits and history navigation stay available
        usecase.set_slot(VIBE_SLOT, image("v")).await.unwrap();
        assert!(usecase.undo().await);

        responses.send(Ok(artifact(3))).unwrap();
        let outcome = join_request(handle).await.unwrap();
        // Appended after its source, whatever the cursor did meanwhile
        assert_eq!(outcome, CompletionOutcome::Applied { cursor: 2, discarded: 0 });
        let snapshot = usecase.snapshot().await;
        assert_eq!(snapshot.history_len, 3);
        assert_eq!(snapshot.cursor, Some(2));
        assert!(!snapshot.is_dirty);
    }

    #[tokio::test]
    async fn test_start_over_discards_late_result() {
        let temp_dir = TempDir::new().unwrap();
        let (usecase, _backend, responses) = usecase(temp_dir.path());
        usecase.upload_images(vec![image("p")]).await;

        let handle = usecase.start_generate().await.unwrap();
        usecase.start_over().await;
        responses.send(Ok(artifact(1))).unwrap();

        assert_eq!(join_request(handle).await.unwrap(), CompletionOutcome::Stale);
        let snapshot = usecase.snapshot().await;
        assert_eq!(snapshot.history_len, 0);
        assert!(!snapshot.has_uploaded_images);
        assert_eq!(snapshot.state, OrchestratorState::Idle);
    }

    #[tokio::test]
    async fn test_new_session_can_start_while_old_request_is_pending() {
        let temp_dir = TempDir::new().unwrap();
        let (usecase, _backend, responses) = usecase(temp_dir.path());
        usecase.upload_images(vec![image("p")]).await;
        let stale = usecase.start_generate().await.unwrap();

        usecase.upload_images(vec![image("p2")]).await;
        let fresh = usecase.start_generate().await.unwrap();

        responses.send(Ok(artifact(1))).unwrap();
        responses.send(Ok(artifact(2))).unwrap();
        assert_eq!(join_request(stale).await.unwrap(), CompletionOutcome::Stale);
        assert_eq!(
            join_request(fresh).await.unwrap(),
            CompletionOutcome::Applied { cursor: 0, discarded: 0 }
        );
        let snapshot = usecase.snapshot().await;
        assert_eq!(snapshot.history_len, 1);
        assert_eq!(snapshot.slots[PORTRAIT_SLOT].file_name.as_deref(), Some("p2"));
    }

    #[tokio::test]
    async fn test_failure_is_published_and_dismissable() {
        let temp_dir = TempDir::new().unwrap();
        let (usecase, _backend, responses) = usecase(temp_dir.path());
        let mut updates = usecase.subscribe();
        usecase.upload_images(vec![image("p")]).await;

        responses
            .send(Err(MakeoverError::backend("quota exceeded")))
            .unwrap();
        let outcome = usecase.generate().await.unwrap();
        assert_eq!(
            outcome,
            CompletionOutcome::Failed("Failed to generate the makeover. quota exceeded".to_string())
        );

        assert!(updates.has_changed().unwrap());
        let published = updates.borrow_and_update().clone();
        assert_eq!(
            published.error.as_deref(),
            Some("Failed to generate the makeover. quota exceeded")
        );
        assert!(!published.is_loading);

        usecase.dismiss_error().await;
        assert!(updates.borrow_and_update().error.is_none());
    }

    #[tokio::test]
    async fn test_reuse_then_download() {
        let temp_dir = TempDir::new().unwrap();
        let (usecase, _backend, responses) = usecase(temp_dir.path());
        usecase
            .upload_images(vec![image("p"), image("e1")])
            .await;

        assert!(usecase.download(None).await.unwrap_err().is_validation());
        responses.send(Ok(artifact(9))).unwrap();
        usecase.generate().await.unwrap();

        let exported = usecase.download(None).await.unwrap();
        assert_eq!(exported.parent(), Some(temp_dir.path()));
        assert_eq!(std::fs::read(&exported).unwrap(), vec![9u8]);

        let elsewhere = temp_dir.path().join("picked");
        let exported = usecase.download(Some(&elsewhere)).await.unwrap();
        assert!(exported.starts_with(&elsewhere));

        usecase.reuse_result_as_reference().await.unwrap();
        let snapshot = usecase.snapshot().await;
        assert_eq!(snapshot.history_len, 0);
        assert!(snapshot.slots[1].file_name.is_none());
        assert!(snapshot.slots[VIBE_SLOT]
            .file_name
            .as_deref()
            .unwrap()
            .starts_with("vibe-from-generated-"));
    }

    #[tokio::test]
    async fn test_upload_files_and_set_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let (usecase, _backend, _responses) = usecase(temp_dir.path());
        let portrait = temp_dir.path().join("me.png");
        let element = temp_dir.path().join("hat.jpg");
        std::fs::write(&portrait, [1u8]).unwrap();
        std::fs::write(&element, [2u8]).unwrap();

        assert_eq!(usecase.upload_files(&[&portrait]).await.unwrap(), 1);
        usecase.set_slot_from_file(1, &element).await.unwrap();

        let snapshot = usecase.snapshot().await;
        assert_eq!(snapshot.slots[0].file_name.as_deref(), Some("me.png"));
        assert_eq!(snapshot.slots[1].mime_type.as_deref(), Some("image/jpeg"));
        assert!(snapshot.can_generate);

        // A bad file leaves the slots untouched
        let missing = temp_dir.path().join("missing.png");
        assert!(usecase.upload_files(&[&missing]).await.is_err());
        assert_eq!(usecase.snapshot().await.slots[1].file_name.as_deref(), Some("hat.jpg"));
        assert!(usecase.remove_slot(7).await.unwrap_err().is_index_out_of_range());
    }
}
