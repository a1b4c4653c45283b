//! Secret service implementation.
//!
//! Reads API keys from `secret.json`. The `GEMINI_API_KEY` environment
//! variable, when set, takes precedence over the file.

use crate::paths::MakeoverPaths;
use anyhow::{Result, anyhow};
use makeover_core::config::{GeminiConfig, SecretConfig};
use makeover_core::error::{MakeoverError, Result as CoreResult};
use makeover_core::secret::SecretService;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Service for managing secret configuration.
///
/// The parsed file is cached after the first successful load.
#[derive(Debug, Clone)]
pub struct SecretServiceImpl {
    path: PathBuf,
    secrets: Arc<RwLock<Option<SecretConfig>>>,
}

impl SecretServiceImpl {
    pub fn default() -> Result<Self> {
        Self::new(&MakeoverPaths::default())
    }

    pub fn new(paths: &MakeoverPaths) -> Result<Self> {
        let path = paths
            .secret_file()
            .map_err(|e| anyhow!("Failed to get secret path: {}", e))?;
        Ok(Self::with_path(path))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            secrets: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_file(&self) -> CoreResult<SecretConfig> {
        {
            let cached = self.secrets.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref secrets) = *cached {
                return Ok(secrets.clone());
            }
        }

        let loaded = if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            // Never echo the file content: it holds the keys
            serde_json::from_str(&content).map_err(|e| {
                MakeoverError::config(format!(
                    "Failed to parse {} (line {}, column {})",
                    self.path.display(),
                    e.line(),
                    e.column()
                ))
            })?
        } else {
            SecretConfig::default()
        };

        let mut cached = self.secrets.write().unwrap_or_else(PoisonError::into_inner);
        *cached = Some(loaded.clone());
        Ok(loaded)
    }
}

/// Overlays the environment API key onto the file configuration.
fn apply_env_override(mut secrets: SecretConfig, env_key: Option<String>) -> SecretConfig {
    if let Some(api_key) = env_key.filter(|key| !key.trim().is_empty()) {
        let model_name = secrets.gemini.and_then(|gemini| gemini.model_name);
        secrets.gemini = Some(GeminiConfig {
            api_key,
            model_name,
        });
    }
    secrets
}

#[async_trait::async_trait]
impl SecretService for SecretServiceImpl {
    async fn load_secrets(&self) -> CoreResult<SecretConfig> {
        let secrets = self.load_file()?;
        Ok(apply_env_override(
            secrets,
            std::env::var(GEMINI_API_KEY_ENV).ok(),
        ))
    }

    async fn secret_file_exists(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_loads_gemini_key_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        std::fs::write(
            &path,
            r#"{"gemini": {"api_key": "file-key", "model_name": "m"}}"#,
        )
        .unwrap();
        let service = SecretServiceImpl::with_path(&path);

        assert!(service.secret_file_exists().await);
        let secrets = service.load_file().unwrap();
        let gemini = secrets.gemini.unwrap();
        assert_eq!(gemini.api_key, "file-key");
        assert_eq!(gemini.model_name.as_deref(), Some("m"));
    }

    #[tokio::test]
    async fn test_missing_file_yields_empty_config() {
        let temp_dir = TempDir::new().unwrap();
        let service = SecretServiceImpl::with_path(temp_dir.path().join("secret.json"));

        assert!(!service.secret_file_exists().await);
        assert!(service.load_file().unwrap().gemini.is_none());
    }

    #[test]
    fn test_malformed_file_does_not_leak_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        std::fs::write(&path, r#"{"gemini": {"api_key": "sk-secret""#).unwrap();
        let service = SecretServiceImpl::with_path(&path);

        let err = service.load_file().unwrap_err();
        assert!(err.is_config());
        assert!(!err.to_string().contains("sk-secret"));
    }

    #[test]
    fn test_env_key_overrides_file_and_keeps_model() {
        let file = SecretConfig {
            gemini: Some(GeminiConfig {
                api_key: "file-key".to_string(),
                model_name: Some("m".to_string()),
            }),
        };

        let merged = apply_env_override(file.clone(), Some("env-key".to_string()));
        let gemini = merged.gemini.unwrap();
        assert_eq!(gemini.api_key, "env-key");
        assert_eq!(gemini.model_name.as_deref(), Some("m"));

        let untouched = apply_env_override(file, Some("  ".to_string()));
        assert_eq!(untouched.gemini.unwrap().api_key, "file-key");
        assert!(apply_env_override(SecretConfig::default(), None).gemini.is_none());
    }
}
