//! Local chat backend running against an Ollama server.
//!
//! Unlike the remote path, this backend owns a slice of server lifecycle:
//! make sure the model exists locally, make sure the server answers, and
//! unload the model afterwards. Each phase is timed for the summary line.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use crate::config::Settings;
use crate::error::BackendError;

use super::ollama::{ModelStore, OllamaCli};
use super::wire::{ChatRequest, ChatResponse};
use super::{ChatBackend, Generation};

/// Inference request timeout. Local models on modest hardware are slow.
const CHAT_TIMEOUT_SECS: u64 = 180;

/// Liveness probe timeout. A running server answers this instantly.
const LIVENESS_TIMEOUT: Duration = Duration::from_millis(250);

/// How long to wait for a freshly launched server to come up.
const READY_TIMEOUT: Duration = Duration::from_secs(12);

/// Poll interval while waiting for readiness.
const READY_POLL: Duration = Duration::from_millis(150);

/// Starts the inference server as a detached background process.
///
/// The only platform-specific piece of the local backend. Implementations
/// must return once the process is launched; readiness is the caller's
/// problem (liveness polling with a deadline).
#[cfg_attr(test, mockall::automock)]
pub trait ServerLauncher: Send + Sync {
    fn spawn_detached(&self) -> Result<(), BackendError>;
}

/// Default launcher shelling out to `ollama serve`.
pub struct DetachedServer;

impl ServerLauncher for DetachedServer {
    #[cfg(windows)]
    fn spawn_detached(&self) -> Result<(), BackendError> {
        // A visible cmd window: closing it terminates the server and
        // unloads models, which is the behavior users expect on Windows.
        std::process::Command::new("cmd")
            .args(["/c", "start", "Ollama Server", "ollama", "serve"])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|source| BackendError::SpawnFailed {
                command: "ollama serve".to_string(),
                source,
            })
    }

    #[cfg(not(windows))]
    fn spawn_detached(&self) -> Result<(), BackendError> {
        std::process::Command::new("ollama")
            .arg("serve")
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|source| BackendError::SpawnFailed {
                command: "ollama serve".to_string(),
                source,
            })
    }
}

/// Where the time went during a local run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseTimings {
    pub pull: Duration,
    pub server_start: Duration,
    pub wait_ready: Duration,
    pub inference: Duration,
    pub total: Duration,
}

/// Result of a local run: the generation plus lifecycle facts the caller
/// reports to the user.
#[derive(Debug)]
pub struct LocalRun {
    pub generation: Generation,
    pub server_started: bool,
    pub timings: PhaseTimings,
}

/// Local backend over an Ollama-compatible server.
pub struct LocalBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    store: Box<dyn ModelStore>,
    launcher: Box<dyn ServerLauncher>,
    ready_timeout: Duration,
}

impl LocalBackend {
    /// Backend with the default Ollama CLI seams. Fails fast if the
    /// `ollama` executable is not installed.
    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        OllamaCli::check_installed()?;
        Ok(Self::with_seams(
            &settings.local_base_url,
            &settings.local_model,
            Box::new(OllamaCli),
            Box::new(DetachedServer),
        ))
    }

    /// Backend with explicit seams, for tests and alternate launchers.
    pub fn with_seams(
        base_url: &str,
        model: &str,
        store: Box<dyn ModelStore>,
        launcher: Box<dyn ServerLauncher>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            store,
            launcher,
            ready_timeout: READY_TIMEOUT,
        }
    }

    /// Shrink the readiness deadline. Tests use this; production keeps 12s.
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full local lifecycle: ensure model, ensure server, infer, unload.
    pub async fn run(&self, prompt: &str) -> Result<LocalRun, BackendError> {
        let t_total = Instant::now();

        let t_pull = Instant::now();
        self.ensure_model().await?;
        let pull = t_pull.elapsed();

        let mut server_started = false;
        let mut server_start = Duration::ZERO;
        let mut wait_ready = Duration::ZERO;

        if !self.is_server_up().await {
            server_started = true;

            let t_start = Instant::now();
            self.launcher.spawn_detached()?;
            server_start = t_start.elapsed();

            let t_wait = Instant::now();
            self.wait_for_server().await?;
            wait_ready = t_wait.elapsed();
        }

        let t_inf = Instant::now();
        let generation = self.chat(prompt).await?;
        let inference = t_inf.elapsed();

        // Best-effort unload; a failure here never spoils a good generation.
        if let Err(e) = self.store.stop(&self.model).await {
            debug!("Failed to unload model {}: {e}", self.model);
        }

        Ok(LocalRun {
            generation,
            server_started,
            timings: PhaseTimings {
                pull,
                server_start,
                wait_ready,
                inference,
                total: t_total.elapsed(),
            },
        })
    }

    /// Pull the model unless `ollama list` already shows it.
    async fn ensure_model(&self) -> Result<(), BackendError> {
        let available = self.store.list().await?;
        if available.iter().any(|m| m == &self.model) {
            return Ok(());
        }

        debug!("Model {} not present, pulling", self.model);
        self.store.pull(&self.model).await
    }

    async fn is_server_up(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(LIVENESS_TIMEOUT)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Poll liveness until the deadline passes.
    async fn wait_for_server(&self) -> Result<(), BackendError> {
        let deadline = Instant::now() + self.ready_timeout;
        while Instant::now() < deadline {
            if self.is_server_up().await {
                return Ok(());
            }
            tokio::time::sleep(READY_POLL).await;
        }
        Err(BackendError::ServerNotReady(self.base_url.clone()))
    }

    async fn chat(&self, prompt: &str) -> Result<Generation, BackendError> {
        let request = ChatRequest::new(&self.model, prompt, Some(false));

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .timeout(Duration::from_secs(CHAT_TIMEOUT_SECS))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(CHAT_TIMEOUT_SECS)
                } else {
                    BackendError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        parsed.into_generation()
    }
}

#[async_trait]
impl ChatBackend for LocalBackend {
    async fn generate(&self, prompt: &str) -> Result<Generation, BackendError> {
        Ok(self.run(prompt).await?.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ollama::MockModelStore;
    use mockall::predicate::eq;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_body(content: &str) -> serde_json::Value {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 50, "completion_tokens": 10, "total_tokens": 60}
        })
    }

    async fn live_server(content: &str) -> MockServer {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(content)))
            .mount(&server)
            .await;

        server
    }

    fn store_with_model(model: &str) -> MockModelStore {
        let model = model.to_string();
        let mut store = MockModelStore::new();
        store
            .expect_list()
            .returning(move || Ok(vec![model.clone()]));
        store.expect_pull().never();
        store.expect_stop().returning(|_| Ok(()));
        store
    }

    #[tokio::test]
    async fn test_run_against_live_server_does_not_launch() {
        let server = live_server("  feat: add parser  ").await;

        let mut launcher = MockServerLauncher::new();
        launcher.expect_spawn_detached().never();

        let backend = LocalBackend::with_seams(
            &server.uri(),
            "gpt-oss:20b",
            Box::new(store_with_model("gpt-oss:20b")),
            Box::new(launcher),
        );

        let run = backend.run("prompt").await.unwrap();
        assert_eq!(run.generation.content, "feat: add parser");
        assert_eq!(run.generation.usage.prompt_tokens, Some(50));
        assert!(!run.server_started);
        assert_eq!(run.timings.server_start, Duration::ZERO);
        assert_eq!(run.timings.wait_ready, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_missing_model_triggers_pull() {
        let server = live_server("fix: typo").await;

        let mut store = MockModelStore::new();
        store
            .expect_list()
            .returning(|| Ok(vec!["other-model:1b".to_string()]));
        store
            .expect_pull()
            .with(eq("gpt-oss:20b"))
            .times(1)
            .returning(|_| Ok(()));
        store.expect_stop().returning(|_| Ok(()));

        let mut launcher = MockServerLauncher::new();
        launcher.expect_spawn_detached().never();

        let backend = LocalBackend::with_seams(
            &server.uri(),
            "gpt-oss:20b",
            Box::new(store),
            Box::new(launcher),
        );

        assert!(backend.run("prompt").await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_server_launches_then_times_out() {
        // Nothing listens on this address, so readiness never arrives.
        let mut launcher = MockServerLauncher::new();
        launcher
            .expect_spawn_detached()
            .times(1)
            .returning(|| Ok(()));

        let mut store = MockModelStore::new();
        store
            .expect_list()
            .returning(|| Ok(vec!["gpt-oss:20b".to_string()]));
        store.expect_pull().never();
        store.expect_stop().never();

        let backend = LocalBackend::with_seams(
            "http://127.0.0.1:9",
            "gpt-oss:20b",
            Box::new(store),
            Box::new(launcher),
        )
        .with_ready_timeout(Duration::from_millis(300));

        let run = backend.run("prompt").await;

        let err = run.unwrap_err();
        assert!(matches!(err, BackendError::ServerNotReady(_)));
        assert!(err.to_string().contains("did not become ready"));
    }

    #[tokio::test]
    async fn test_stop_failure_is_swallowed() {
        let server = live_server("chore: bump deps").await;

        let mut store = MockModelStore::new();
        store
            .expect_list()
            .returning(|| Ok(vec!["gpt-oss:20b".to_string()]));
        store.expect_stop().returning(|_| {
            Err(BackendError::SpawnFailed {
                command: "ollama stop gpt-oss:20b".to_string(),
                source: std::io::Error::other("gone"),
            })
        });

        let mut launcher = MockServerLauncher::new();
        launcher.expect_spawn_detached().never();

        let backend = LocalBackend::with_seams(
            &server.uri(),
            "gpt-oss:20b",
            Box::new(store),
            Box::new(launcher),
        );

        let run = backend.run("prompt").await.unwrap();
        assert_eq!(run.generation.content, "chore: bump deps");
    }

    #[tokio::test]
    async fn test_server_error_status_surfaces() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model exploded"))
            .mount(&server)
            .await;

        let mut launcher = MockServerLauncher::new();
        launcher.expect_spawn_detached().never();

        let mut store = MockModelStore::new();
        store
            .expect_list()
            .returning(|| Ok(vec!["gpt-oss:20b".to_string()]));
        store.expect_stop().never();

        let backend = LocalBackend::with_seams(
            &server.uri(),
            "gpt-oss:20b",
            Box::new(store),
            Box::new(launcher),
        );

        let err = backend.run("prompt").await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_generate_trait_returns_generation() {
        let server = live_server("docs: clarify usage").await;

        let mut launcher = MockServerLauncher::new();
        launcher.expect_spawn_detached().never();

        let backend = LocalBackend::with_seams(
            &server.uri(),
            "gpt-oss:20b",
            Box::new(store_with_model("gpt-oss:20b")),
            Box::new(launcher),
        );

        let generation = backend.generate("prompt").await.unwrap();
        assert_eq!(generation.content, "docs: clarify usage");
    }
}
