//! Configuration service implementation.
//!
//! Loads the root configuration from `config.toml`, writing the defaults on
//! first access when the file is missing.

use crate::paths::MakeoverPaths;
use anyhow::{Context, Result, anyhow};
use makeover_core::config::RootConfig;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    paths: MakeoverPaths,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    pub fn new(paths: MakeoverPaths) -> Result<Self> {
        let path = paths
            .config_file()
            .map_err(|e| anyhow!("Failed to get config path: {}", e))?;
        Ok(Self {
            path,
            paths,
            config: Arc::new(RwLock::new(None)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the root configuration, loading from file if not cached.
    ///
    /// A malformed file is reported, not silently replaced.
    pub fn get_config(&self) -> Result<RootConfig> {
        {
            let cached = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref config) = *cached {
                return Ok(config.clone());
            }
        }

        let loaded = self.load_config()?;

        let mut cached = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *cached = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut cached = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *cached = None;
    }

    /// Directory downloads are written to: the configured one, or `exports/`
    /// under the data directory.
    pub fn output_dir(&self) -> Result<PathBuf> {
        if let Some(directory) = self.get_config()?.output.directory {
            return Ok(directory);
        }
        self.paths
            .exports_dir()
            .map_err(|e| anyhow!("Failed to get exports path: {}", e))
    }

    fn load_config(&self) -> Result<RootConfig> {
        if !self.path.exists() {
            let config = RootConfig::default();
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(&self.path, content)
                .with_context(|| format!("Failed to write {}", self.path.display()))?;
            tracing::info!(path = %self.path.display(), "Wrote default configuration");
            return Ok(config);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use makeover_core::config::DEFAULT_IMAGE_MODEL;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(MakeoverPaths::new(Some(temp_dir.path()))).unwrap();

        let config = service.get_config().unwrap();

        assert_eq!(config, RootConfig::default());
        assert!(service.path().exists());
        assert_eq!(
            service.output_dir().unwrap(),
            temp_dir.path().join("data").join("exports")
        );
    }

    #[test]
    fn test_reads_configured_values_and_cache() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(MakeoverPaths::new(Some(temp_dir.path()))).unwrap();
        std::fs::create_dir_all(service.path().parent().unwrap()).unwrap();
        std::fs::write(
            service.path(),
            "[backend]\nmodel = \"custom-model\"\n\n[output]\ndirectory = \"/tmp/out\"\n",
        )
        .unwrap();

        let config = service.get_config().unwrap();
        assert_eq!(config.backend.model, "custom-model");
        assert_eq!(service.output_dir().unwrap(), PathBuf::from("/tmp/out"));

        // Cached until invalidated
        std::fs::write(service.path(), "").unwrap();
        assert_eq!(service.get_config().unwrap().backend.model, "custom-model");
        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().backend.model, DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(MakeoverPaths::new(Some(temp_dir.path()))).unwrap();
        std::fs::create_dir_all(service.path().parent().unwrap()).unwrap();
        std::fs::write(service.path(), "[backend\nmodel = ").unwrap();

        assert!(service.get_config().is_err());
    }
}
