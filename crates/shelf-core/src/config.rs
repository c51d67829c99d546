//! Configuration management for shelf
//!
//! Settings are read from `shelf.toml` (or an explicit path). Every section
//! and field has a default, so a missing file or a partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "shelf.toml";

/// Top-level shelf configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShelfConfig {
    /// Database file locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Natural-language SQL agent settings
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Database file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Library context database (users, books)
    #[serde(default = "default_library_db")]
    pub library_db: PathBuf,

    /// Task context database (users, tasks)
    #[serde(default = "default_tasks_db")]
    pub tasks_db: PathBuf,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind
    #[serde(default = "default_bind")]
    pub bind: String,
}

/// LLM settings for the SQL agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of an OpenAI-compatible chat completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Environment variable containing API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Maximum number of result rows shown to the model
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// HTTP request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// Default value providers
fn default_library_db() -> PathBuf {
    PathBuf::from("library.db")
}

fn default_tasks_db() -> PathBuf {
    PathBuf::from("tasks.db")
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_rows() -> usize {
    50
}

fn default_timeout_secs() -> u64 {
    60
}

impl ShelfConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `shelf.toml` in the current
    /// directory is used when present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write the default configuration to `path`
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            library_db: default_library_db(),
            tasks_db: default_tasks_db(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: 0.0,
            api_key_env: default_api_key_env(),
            max_rows: default_max_rows(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shelf.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "0.0.0.0:9000"

[agent]
model = "gpt-4o-mini"
"#,
        )
        .unwrap();

        let config = ShelfConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.agent.model, "gpt-4o-mini");
        assert_eq!(config.agent.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.agent.max_rows, 50);
        assert_eq!(config.storage.library_db, PathBuf::from("library.db"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = ShelfConfig::load(Some(&dir.path().join("nope.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shelf.toml");
        std::fs::write(&path, "[server\nbind = 1").unwrap();

        let err = ShelfConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_write_default_roundtrips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("shelf.toml");
        ShelfConfig::write_default(&path).unwrap();

        let config = ShelfConfig::from_file(&path).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.storage.tasks_db, PathBuf::from("tasks.db"));
    }
}
