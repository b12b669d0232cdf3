//! Settings loaded once at startup and handed to the pipeline as an immutable value.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backend::BackendKind;
use crate::error::ConfigError;

/// User-tunable settings from `config.toml`.
///
/// Every field has a default so a missing or partial file just works.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Full chat-completions endpoint URL for the remote backend.
    pub api_url: String,

    /// Model identifier sent to the remote backend.
    pub api_model: String,

    /// Name of the environment variable holding the API key.
    pub api_key_env: String,

    /// Model identifier for the local Ollama server.
    pub local_model: String,

    /// Base URL of the local Ollama server.
    pub local_base_url: String,

    /// Which backend runs when neither --local nor --api is given.
    pub default_backend: BackendKind,

    /// Line budget for the hard-truncated diff sent to the remote backend.
    pub max_diff_lines: usize,

    /// Changed-line budget for the sparse digest sent to the local backend.
    pub max_local_changed_lines: usize,

    /// Treat staged-diff read failures as fatal instead of degrading to empty.
    pub strict_git: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_model: "gpt-5-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            local_model: "gpt-oss:20b".to_string(),
            local_base_url: "http://localhost:11434".to_string(),
            default_backend: BackendKind::Api,
            max_diff_lines: 360,
            max_local_changed_lines: 180,
            strict_git: false,
        }
    }
}

impl Settings {
    /// Load from the default location; a missing file means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path())
    }

    /// Load from an explicit path. A malformed file is an error, not a default.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Directory holding `config.toml`, `prompt.txt`, and `pricing.json`.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("diffscribe")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Optional user override for the built-in prompt template.
pub fn prompt_template_path() -> PathBuf {
    config_dir().join("prompt.txt")
}

/// Optional user override for the built-in pricing table.
pub fn pricing_path() -> PathBuf {
    config_dir().join("pricing.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let settings = Settings::load_from(Path::new("/nonexistent/diffscribe/config.toml"))
            .expect("missing file should fall back to defaults");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.api_model, "gpt-5-mini");
        assert_eq!(settings.api_key_env, "OPENAI_API_KEY");
        assert_eq!(settings.default_backend, BackendKind::Api);
        assert_eq!(settings.max_diff_lines, 360);
        assert_eq!(settings.max_local_changed_lines, 180);
        assert!(!settings.strict_git);
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_model = \"gpt-4.1\"\nmax_diff_lines = 100\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.api_model, "gpt-4.1");
        assert_eq!(settings.max_diff_lines, 100);
        assert_eq!(settings.api_url, Settings::default().api_url);
        assert_eq!(settings.local_model, Settings::default().local_model);
    }

    #[test]
    fn test_backend_kind_parses_lowercase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_backend = \"local\"\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.default_backend, BackendKind::Local);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_model = [this is not toml\n").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
