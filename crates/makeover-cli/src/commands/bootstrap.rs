use anyhow::{Result, anyhow};
use makeover_application::MakeoverUseCase;
use makeover_execution::{GenerationEvent, init_tracing};
use makeover_infrastructure::{ConfigService, MakeoverPaths, SecretServiceImpl};
use makeover_interaction::GeminiImageBackend;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

/// A wired-up use case plus the log writer guard that must outlive it.
pub struct App {
    pub usecase: MakeoverUseCase,
    _log_guard: WorkerGuard,
}

/// Builds the use case once logging, configuration and secrets are in place.
pub async fn build(
    base_dir: Option<&Path>,
    events: Option<mpsc::UnboundedSender<GenerationEvent>>,
) -> Result<App> {
    let paths = MakeoverPaths::new(base_dir);
    let logs_dir = paths
        .logs_dir()
        .map_err(|e| anyhow!("Failed to get logs path: {}", e))?;
    let log_guard = init_tracing(&logs_dir, events)?;

    let config_service = ConfigService::new(paths.clone())?;
    let config = config_service.get_config()?;
    let secrets = SecretServiceImpl::new(&paths)?;
    let backend = GeminiImageBackend::try_from_services(&secrets, &config).await?;
    let output_dir = config_service.output_dir()?;

    tracing::info!(
        model = backend.model(),
        output_dir = %output_dir.display(),
        "Makeover initialised"
    );

    Ok(App {
        usecase: MakeoverUseCase::new(Arc::new(backend), output_dir),
        _log_guard: log_guard,
    })
}
