//! Remote chat-completion backend (OpenAI-compatible API).

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::Settings;
use crate::error::{AuthError, BackendError};

use super::wire::{ChatRequest, ChatResponse};
use super::{ChatBackend, Generation};

/// Request timeout for the remote API. No retries: a failure surfaces as-is.
const API_TIMEOUT_SECS: u64 = 90;

/// Remote API backend: one synchronous POST, bearer auth from the environment.
#[derive(Debug)]
pub struct ApiBackend {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl ApiBackend {
    /// Build a backend from explicit parts. The credential is taken as given.
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Build from settings, reading the API key from the configured
    /// environment variable. Fails before any network traffic if it is
    /// unset or empty.
    pub fn from_settings(settings: &Settings) -> Result<Self, AuthError> {
        let api_key = env::var(&settings.api_key_env)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AuthError {
                var: settings.api_key_env.clone(),
            })?;

        Ok(Self::new(&settings.api_url, &settings.api_model, api_key))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatBackend for ApiBackend {
    async fn generate(&self, prompt: &str) -> Result<Generation, BackendError> {
        let request = ChatRequest::new(&self.model, prompt, None);

        debug!("POST {} (model {})", self.url, self.model);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(API_TIMEOUT_SECS)
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
