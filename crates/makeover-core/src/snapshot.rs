//! Read-only presentation view of the composition state.

use crate::controller::CompositionController;
use crate::orchestrator::OrchestratorState;
use crate::slot::{SlotRole, slot_label};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Summary of one slot for rendering (no image bytes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSummary {
    pub index: usize,
    pub role: SlotRole,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub size_bytes: usize,
}

/// Everything the presentation layer needs to render one frame, including
/// the derived enablement of each action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionSnapshot {
    pub slots: Vec<SlotSummary>,
    pub has_uploaded_images: bool,
    pub has_portrait: bool,
    pub history_len: usize,
    pub cursor: Option<usize>,
    pub current_artifact_id: Option<Uuid>,
    pub is_dirty: bool,
    pub state: OrchestratorState,
    pub is_loading: bool,
    pub error: Option<String>,
    pub can_generate: bool,
    /// "Regenerate" is offered once an artifact exists and the inputs changed.
    pub show_regenerate: bool,
    pub can_undo: bool,
    pub can_redo: bool,
    pub can_reuse: bool,
    pub can_download: bool,
}

impl CompositionSnapshot {
    pub(crate) fn capture(controller: &CompositionController) -> Self {
        let slots = controller
            .slots()
            .iter()
            .enumerate()
            .map(|(index, image)| SlotSummary {
                index,
                // iter() only yields valid positions
                role: SlotRole::for_index(index).unwrap_or(SlotRole::StyleElement),
                label: slot_label(index),
                file_name: image.map(|image| image.name().to_string()),
                mime_type: image.map(|image| image.mime_type().to_string()),
                size_bytes: image.map_or(0, |image| image.len()),
            })
            .collect();

        let history = controller.history();
        let state = controller.state().clone();
        let is_loading = state.is_generating();
        let has_artifact = history.current().is_some();
        let has_portrait = controller.slots().portrait().is_some();

        Self {
            slots,
            has_uploaded_images: controller.slots().has_any(),
            has_portrait,
            history_len: history.len(),
            cursor: history.cursor(),
            current_artifact_id: history.current().map(|artifact| artifact.id()),
            is_dirty: controller.is_dirty(),
            error: state.error_message().map(str::to_string),
            is_loading,
            can_generate: has_portrait && !is_loading,
            show_regenerate: has_artifact && controller.is_dirty(),
            can_undo: history.can_undo() && !is_loading,
            can_redo: history.can_redo() && !is_loading,
            can_reuse: has_artifact && !is_loading,
            can_download: has_artifact && !is_loading,
            state,
        }
    }

    pub fn has_artifact(&self) -> bool {
        self.current_artifact_id.is_some()
    }

    /// Whether "Apply" is enabled for the given instruction text.
    pub fn can_apply_edit(&self, instruction: &str) -> bool {
        self.has_artifact() && !self.is_loading && !instruction.trim().is_empty()
    }
}
