//! Chat-completion backends: remote API and local Ollama.

pub mod api;
pub mod local;
pub mod ollama;

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::BackendError;

pub use api::ApiBackend;
pub use local::{LocalBackend, LocalRun, PhaseTimings, ServerLauncher};
pub use ollama::{ModelStore, OllamaCli};

/// Which backend generates the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Api,
    Local,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Api => "api",
            BackendKind::Local => "local",
        }
    }

    /// Resolve the backend from CLI flags, falling back to the config default.
    ///
    /// `--local` wins over `--api`; with neither flag the config decides.
    pub fn resolve(local_flag: bool, api_flag: bool, default: BackendKind) -> BackendKind {
        if local_flag {
            BackendKind::Local
        } else if api_flag {
            BackendKind::Api
        } else {
            default
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token counts reported by a backend.
///
/// Every field is advisory. Backends that report nothing still produce a
/// usable generation; the cost report just stays silent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

/// A completed generation: the model's text plus whatever usage it reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Model output with leading/trailing whitespace already stripped.
    pub content: String,
    pub usage: TokenUsage,
}

/// The single capability both backends provide.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Generation, BackendError>;
}

/// System instruction sent with every chat request, on both backends.
pub(crate) const SYSTEM_PROMPT: &str = "You write precise, technical git commit messages.";

/// Wire types for the OpenAI-style chat endpoint both backends speak.
pub(crate) mod wire {
    use serde::{Deserialize, Serialize};

    use crate::error::BackendError;

    use super::{Generation, SYSTEM_PROMPT, TokenUsage};

    #[derive(Serialize)]
    pub struct ChatRequest<'a> {
        pub model: &'a str,
        pub messages: Vec<ChatMessage<'a>>,
        /// Only the local endpoint needs an explicit `stream: false`.
        #[serde(skip_serializing_if = "Option::is_none")]
        pub stream: Option<bool>,
    }

    impl<'a> ChatRequest<'a> {
        pub fn new(model: &'a str, prompt: &'a str, stream: Option<bool>) -> Self {
            Self {
                model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: SYSTEM_PROMPT,
                    },
                    ChatMessage {
                        role: "user",
                        content: prompt,
                    },
                ],
                stream,
            }
        }
    }

    #[derive(Serialize)]
    pub struct ChatMessage<'a> {
        pub role: &'a str,
        pub content: &'a str,
    }

    #[derive(Deserialize)]
    pub struct ChatResponse {
        pub choices: Vec<ChatChoice>,
        pub usage: Option<TokenUsage>,
    }

    #[derive(Deserialize)]
    pub struct ChatChoice {
        pub message: ChoiceMessage,
    }

    #[derive(Deserialize)]
    pub struct ChoiceMessage {
        pub content: String,
    }

    impl ChatResponse {
        /// First choice's content, trimmed, plus whatever usage came back.
        pub fn into_generation(self) -> Result<Generation, BackendError> {
            let content = self
                .choices
                .first()
                .map(|c| c.message.content.trim().to_string())
                .ok_or_else(|| {
                    BackendError::MalformedResponse("response has no choices".to_string())
                })?;

            Ok(Generation {
                content,
                usage: self.usage.unwrap_or_default(),
            })
        }
    }
}
