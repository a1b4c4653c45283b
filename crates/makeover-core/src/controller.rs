//! Composition controller: the façade turning user intents into state changes.
//!
//! The controller is the only owner of the slot store, dirty tracker, history
//! and orchestrator. Every mutation goes through one of its methods, and the
//! presentation layer reads [`CompositionSnapshot`]s. Backend calls are not
//! made here: starting a generation returns a [`PendingRequest`] that the
//! caller executes and then hands back through [`CompositionController::complete`].

use crate::dirty::DirtyTracker;
use crate::error::{MakeoverError, Result};
use crate::history::HistorySequence;
use crate::image::{Artifact, ImageRef};
use crate::orchestrator::{
    CompletionOutcome, GenerationOrchestrator, OrchestratorState, PendingRequest, RequestTicket,
};
use crate::slot::{SlotStore, VIBE_SLOT};
use crate::snapshot::CompositionSnapshot;
use tracing::{debug, info};

pub const NOTHING_TO_REUSE_MESSAGE: &str = "There is no generated image to refine with.";
pub const NOTHING_TO_DOWNLOAD_MESSAGE: &str = "There is no generated image to download.";

#[derive(Debug, Clone, Default)]
pub struct CompositionController {
    slots: SlotStore,
    dirty: DirtyTracker,
    history: HistorySequence,
    orchestrator: GenerationOrchestrator,
}

impl CompositionController {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================================================
    // Slot intents
    // ============================================================================

    /// Replaces all slots from an uploaded file list and starts a fresh session.
    ///
    /// The first seven images fill the slots in order; the rest are dropped.
    /// An empty list is ignored. Returns the number of images placed.
    pub fn initial_upload(&mut self, images: Vec<ImageRef>) -> usize {
        if images.is_empty() {
            return 0;
        }
        let received = images.len();
        let placed = self.slots.set_all(images);
        self.reset_session();
        info!(received, placed, "Initial upload replaced all slots");
        placed
    }

    /// Replaces one slot. Marks the inputs dirty.
    pub fn update_slot(&mut self, index: usize, image: ImageRef) -> Result<()> {
        debug!(index, name = image.name(), "Updating slot");
        self.slots.set(index, image)?;
        self.dirty.mark_dirty();
        Ok(())
    }

    /// Empties one slot. Marks the inputs dirty.
    pub fn remove_slot(&mut self, index: usize) -> Result<()> {
        debug!(index, "Removing slot");
        self.slots.clear(index)?;
        self.dirty.mark_dirty();
        Ok(())
    }

    // ============================================================================
    // Generation intents
    // ============================================================================

    /// Starts a full generation (or regeneration) from the current slots.
    ///
    /// History is reset as soon as the request is accepted: a full generation
    /// always starts a new sequence. Rejected requests leave everything as is.
    pub fn begin_generate(&mut self) -> Result<PendingRequest> {
        let pending = self
            .orchestrator
            .start_full_generation(self.slots.generation_inputs())?;
        self.history.reset();
        Ok(pending)
    }

    /// Starts an edit of the currently displayed artifact.
    ///
    /// On success the result is appended right after its source, even if the
    /// cursor moved while the request was in flight. Earlier edits and the
    /// generation root stay reachable through undo.
    pub fn begin_edit(&mut self, instruction: &str) -> Result<PendingRequest> {
        self.orchestrator
            .start_edit(&self.history, instruction)
    }

    /// Delivers a backend result for a previously started request.
    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        result: Result<Artifact>,
    ) -> CompletionOutcome {
        self.orchestrator
            .complete(ticket, result, &mut self.history, &mut self.dirty)
    }

    /// Clears the error state, if any.
    pub fn dismiss_error(&mut self) {
        self.orchestrator.dismiss();
    }

    // ============================================================================
    // History intents
    // ============================================================================

    pub fn undo(&mut self) -> bool {
        self.history.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo()
    }

    // ============================================================================
    // Session intents
    // ============================================================================

    /// Empties every slot and the history, clears dirty and error state.
    ///
    /// Any in-flight request is abandoned; its result will be discarded.
    pub fn start_over(&mut self) {
        self.slots.clear_all();
        self.reset_session();
        info!("Started over");
    }

    /// Seeds a fresh session with the current artifact as vibe reference.
    ///
    /// Keeps the portrait, clears the style elements and puts the artifact in
    /// the vibe slot. Calling it again before generating simply overwrites the
    /// vibe slot.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if there is no current artifact.
    pub fn reuse_result_as_reference(&mut self) -> Result<()> {
        let artifact = self
            .history
            .current()
            .ok_or_else(|| MakeoverError::validation(NOTHING_TO_REUSE_MESSAGE))?;
        let vibe = artifact.to_image_ref(format!(
            "vibe-from-generated-{}.png",
            chrono::Utc::now().timestamp_millis()
        ));
        info!(artifact = %artifact.id(), "Reusing result as vibe reference");

        self.slots.clear_elements();
        self.slots.set(VIBE_SLOT, vibe)?;
        self.reset_session();
        Ok(())
    }

    /// Returns the artifact to export.
    ///
    /// # Errors
    ///
    /// - `Busy` while a request is outstanding
    /// - `Validation` if there is no current artifact
    pub fn artifact_for_download(&self) -> Result<Artifact> {
        if self.orchestrator.is_busy() {
            return Err(MakeoverError::Busy);
        }
        self.history
            .current()
            .cloned()
            .ok_or_else(|| MakeoverError::validation(NOTHING_TO_DOWNLOAD_MESSAGE))
    }

    // ============================================================================
    // Queries
    // ============================================================================

    pub fn slots(&self) -> &SlotStore {
        &self.slots
    }

    pub fn history(&self) -> &HistorySequence {
        &self.history
    }

    pub fn current_artifact(&self) -> Option<&Artifact> {
        self.history.current()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    pub fn state(&self) -> &OrchestratorState {
        self.orchestrator.state()
    }

    pub fn orchestrator(&self) -> &GenerationOrchestrator {
        &self.orchestrator
    }

    /// Read-only view for the presentation layer.
    pub fn snapshot(&self) -> CompositionSnapshot {
        CompositionSnapshot::capture(self)
    }

    fn reset_session(&mut self) {
        self.history.reset();
        self.dirty.mark_clean();
        self.orchestrator.reset_session();
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;
