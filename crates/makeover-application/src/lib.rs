//! Application layer for Makeover.
//!
//! Wires the composition controller to the image backend and the filesystem,
//! and publishes presentation snapshots to whoever renders them.

pub mod makeover_usecase;

pub use makeover_usecase::MakeoverUseCase;
