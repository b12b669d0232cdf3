//! diffscribe - A CLI tool that writes your git commit message from the staged diff.
//!
//! # Overview
//!
//! diffscribe reduces the staged diff into a bounded prompt, asks a chat
//! backend (remote API or local Ollama) for a Conventional Commit message,
//! shows it for approval, and runs `git commit` with the approved text.

pub mod backend;
pub mod commit;
pub mod config;
pub mod cost;
pub mod error;
pub mod git;

// Re-export commonly used types
pub use backend::{BackendKind, ChatBackend, Generation, TokenUsage};
pub use commit::{CommitMessage, CommitOptions, CommitOutcome, DiffDigest, ReductionPolicy};
pub use config::Settings;
pub use cost::{CostEstimate, PricingEntry, PricingTable};
pub use error::{AuthError, BackendError, ConfigError, EmptyOutputError, VcsError};
