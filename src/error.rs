//! Error types for diffscribe modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Missing credential for the remote backend, detected before any network traffic.
#[derive(Error, Debug)]
#[error(
    "Environment variable '{var}' is not set. Export your API key or change `api_key_env` in config.toml"
)]
pub struct AuthError {
    pub var: String,
}

/// Errors from either chat backend (transport, protocol, or server lifecycle).
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("API error: {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API connection error: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Backend did not respond within {0} seconds")]
    Timeout(u64),

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Ollama server did not become ready ({0})")]
    ServerNotReady(String),

    #[error("Ollama CLI not found. Install from https://ollama.com and ensure `ollama` is on PATH")]
    OllamaNotInstalled,

    #[error("Failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'ollama pull {model}' exited with code {code}")]
    PullFailed { model: String, code: i32 },
}

/// The model replied, but with nothing usable as a commit subject.
#[derive(Error, Debug)]
#[error("Model returned an empty commit message")]
pub struct EmptyOutputError;

/// Errors from git subprocess invocations.
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("Failed to run 'git {operation}': {source}")]
    Spawn {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'git {operation}' failed: {stderr}")]
    CommandFailed { operation: String, stderr: String },

    #[error("git commit failed with code {code}")]
    CommitFailed { code: i32 },
}

/// Errors loading the config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
