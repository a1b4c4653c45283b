//! Composition-and-history engine for AI portrait makeovers.
//!
//! The user fills seven input slots (portrait, five style elements, vibe),
//! requests a composite from an external image backend, then refines it
//! with natural-language edits and walks the results with undo/redo.
//!
//! - [`slot`]: the fixed slot store and the generation input snapshot
//! - [`dirty`]: inputs-changed-since-last-result flag
//! - [`history`]: truncating undo/redo sequence of artifacts
//! - [`orchestrator`]: single-flight request state machine with session tokens
//! - [`controller`]: façade applying user intents
//! - [`snapshot`]: read-only presentation view

pub mod backend;
pub mod config;
pub mod controller;
pub mod dirty;
pub mod error;
pub mod history;
pub mod image;
pub mod orchestrator;
pub mod secret;
pub mod slot;
pub mod snapshot;

pub use backend::ImageBackend;
pub use controller::CompositionController;
pub use error::{MakeoverError, Result};
pub use history::HistorySequence;
pub use image::{Artifact, ImageRef};
pub use orchestrator::{
    CompletionOutcome, GenerationRequest, OrchestratorState, PendingRequest, RequestKind,
    RequestTicket, SessionToken,
};
pub use slot::{GenerationInputs, SlotRole, SlotStore};
pub use snapshot::CompositionSnapshot;
