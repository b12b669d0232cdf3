//! diffscribe - CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use diffscribe::backend::BackendKind;
use diffscribe::commit::{CommitOptions, run_commit};
use diffscribe::config::Settings;
use diffscribe::error::VcsError;

/// Generate an AI-authored commit message from the staged diff.
#[derive(Parser, Debug)]
#[command(name = "diffscribe")]
#[command(about = "Generate an AI-authored commit message from the staged diff")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a commit message for the staged changes and commit on approval
    Commit {
        /// Use the local Ollama backend
        #[arg(long)]
        local: bool,

        /// Use the remote API backend
        #[arg(long)]
        api: bool,

        /// Optional manual topic the message must echo on a Topic: line
        #[arg(short = 'm', long = "message", default_value = "")]
        message: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[error] {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("Failed to load configuration")?;

    match cli.command {
        Commands::Commit {
            local,
            api,
            message,
        } => {
            let options = CommitOptions {
                backend: BackendKind::resolve(local, api, settings.default_backend),
                manual_topic: message,
                repo_dir: PathBuf::from("."),
            };

            run_commit(&settings, &options).await?;
            Ok(())
        }
    }
}

/// Map a failure to the process exit code: git's own code when the final
/// commit failed, 1 for everything else.
fn exit_code_for(error: &anyhow::Error) -> u8 {
    if let Some(VcsError::CommitFailed { code }) = error.downcast_ref::<VcsError>() {
        return u8::try_from(*code).unwrap_or(1);
    }
    1
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}
