use crate::image::ImageRef;

/// Snapshot of the slots captured when a full generation starts.
///
/// Derived from [`super::SlotStore`], never stored independently. Later slot
/// edits do not affect a snapshot already handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationInputs {
    pub portrait: ImageRef,
    /// Present style elements in slot order (at most five).
    pub elements: Vec<ImageRef>,
    pub vibe: Option<ImageRef>,
}

impl GenerationInputs {
    /// Number of images sent to the backend.
    pub fn image_count(&self) -> usize {
        1 + self.elements.len() + usize::from(self.vibe.is_some())
    }
}
