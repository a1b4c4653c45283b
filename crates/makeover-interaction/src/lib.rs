//! External image backend for the makeover engine.

pub mod gemini_image_backend;
pub mod prompts;

pub use gemini_image_backend::GeminiImageBackend;
