//! Logging plumbing for the makeover binaries.
//!
//! Logs go to a daily rolling file so interactive output stays clean;
//! makeover events can additionally be streamed to the presentation layer.

pub mod tracing_layer;

pub use tracing_layer::{GenerationEvent, GenerationEventLayer};

use anyhow::{Context, Result};
use std::path::Path;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_FILE_PREFIX: &str = "makeover.log";

/// Installs the global subscriber.
///
/// The filter comes from `RUST_LOG`, falling back to `info`. Keep the
/// returned guard alive for the whole program; dropping it flushes and stops
/// the file writer.
pub fn init_tracing(
    logs_dir: &Path,
    events: Option<mpsc::UnboundedSender<GenerationEvent>>,
) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create {}", logs_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer),
        )
        .with(events.map(GenerationEventLayer::new))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
