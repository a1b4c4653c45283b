//! Slot domain module.
//!
//! The composition works from exactly seven input positions:
//!
//! - `0`: the main portrait (required to generate)
//! - `1..=5`: style elements (clothes, accessories, ...)
//! - `6`: the vibe / mood reference
//!
//! # Module Structure
//!
//! - `store`: the fixed-size slot container (`SlotStore`)
//! - `inputs`: the snapshot handed to the backend (`GenerationInputs`)

mod inputs;
mod store;

pub use inputs::GenerationInputs;
pub use store::SlotStore;

use serde::{Deserialize, Serialize};

/// Total number of slots.
pub const SLOT_COUNT: usize = 7;
/// Position of the main portrait.
pub const PORTRAIT_SLOT: usize = 0;
/// Positions of the style elements.
pub const ELEMENT_SLOTS: std::ops::RangeInclusive<usize> = 1..=5;
/// Position of the vibe reference.
pub const VIBE_SLOT: usize = 6;

/// The role a slot plays in the composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRole {
    Portrait,
    StyleElement,
    Vibe,
}

impl SlotRole {
    /// Returns the role of a slot position, or `None` outside `0..SLOT_COUNT`.
    pub fn for_index(index: usize) -> Option<Self> {
        match index {
            PORTRAIT_SLOT => Some(Self::Portrait),
            VIBE_SLOT => Some(Self::Vibe),
            i if ELEMENT_SLOTS.contains(&i) => Some(Self::StyleElement),
            _ => None,
        }
    }
}

/// Human-facing label for a slot position.
pub fn slot_label(index: usize) -> String {
    match SlotRole::for_index(index) {
        Some(SlotRole::Portrait) => "Face / Portrait*".to_string(),
        Some(SlotRole::StyleElement) => format!("Element {index}"),
        Some(SlotRole::Vibe) => "Vibe Image".to_string(),
        None => format!("Slot {index}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_cover_every_slot() {
        assert_eq!(SlotRole::for_index(0), Some(SlotRole::Portrait));
        for i in 1..=5 {
            assert_eq!(SlotRole::for_index(i), Some(SlotRole::StyleElement));
        }
        assert_eq!(SlotRole::for_index(6), Some(SlotRole::Vibe));
        assert_eq!(SlotRole::for_index(7), None);
    }

    #[test]
    fn test_slot_labels() {
        assert_eq!(slot_label(0), "Face / Portrait*");
        assert_eq!(slot_label(3), "Element 3");
        assert_eq!(slot_label(6), "Vibe Image");
    }
}
