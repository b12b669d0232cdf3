//! Ollama CLI seam: model list, pull, and unload via subprocess.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::BackendError;

/// Model management operations backed by the `ollama` CLI.
///
/// A trait so the local backend's lifecycle logic is testable without a real
/// Ollama installation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Names of models already available locally.
    async fn list(&self) -> Result<Vec<String>, BackendError>;

    /// Download a model, blocking until the pull completes. May take minutes;
    /// there is deliberately no timeout here.
    async fn pull(&self, model: &str) -> Result<(), BackendError>;

    /// Ask the server to unload a model.
    async fn stop(&self, model: &str) -> Result<(), BackendError>;
}

/// Default store that shells out to `ollama`.
pub struct OllamaCli;

impl OllamaCli {
    /// Verify the `ollama` executable is on PATH before any subprocess call.
    pub fn check_installed() -> Result<(), BackendError> {
        if which::which("ollama").is_err() {
            return Err(BackendError::OllamaNotInstalled);
        }
        Ok(())
    }
}

#[async_trait]
impl ModelStore for OllamaCli {
    async fn list(&self) -> Result<Vec<String>, BackendError> {
        let output = Command::new("ollama")
            .arg("list")
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|source| BackendError::SpawnFailed {
                command: "ollama list".to_string(),
                source,
            })?;

        // A failing list degrades to "nothing available"; the pull that
        // follows will surface a real problem.
        if !output.status.success() {
            return Ok(Vec::new());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .skip(1) // column header
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_string)
            .collect())
    }

    async fn pull(&self, model: &str) -> Result<(), BackendError> {
        // Inherited stdio so the user sees download progress.
        let status = Command::new("ollama")
            .arg("pull")
            .arg(model)
            .status()
            .await
            .map_err(|source| BackendError::SpawnFailed {
                command: format!("ollama pull {model}"),
                source,
            })?;

        if !status.success() {
            return Err(BackendError::PullFailed {
                model: model.to_string(),
                code: status.code().unwrap_or(-1),
            });
        }

        Ok(())
    }

    async fn stop(&self, model: &str) -> Result<(), BackendError> {
        let status = Command::new("ollama")
            .arg("stop")
            .arg(model)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| BackendError::SpawnFailed {
                command: format!("ollama stop {model}"),
                source,
            })?;

        if !status.success() {
            return Err(BackendError::SpawnFailed {
                command: format!("ollama stop {model}"),
                source: std::io::Error::other(format!(
                    "exit code {}",
                    status.code().unwrap_or(-1)
                )),
            });
        }

        Ok(())
    }
}
