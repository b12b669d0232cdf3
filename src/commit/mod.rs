//! Commit pipeline: reduce the staged diff, prompt a backend, confirm, commit.

pub mod digest;
pub mod message;
pub mod prompt;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use dialoguer::Input;
use tracing::warn;

use crate::backend::{ApiBackend, BackendKind, ChatBackend, Generation, LocalBackend};
use crate::config::{self, Settings};
use crate::cost;
use crate::git;

pub use digest::{DiffDigest, ReductionPolicy, reduce};
pub use message::{CommitMessage, ensure_topic, split};
pub use prompt::{build_prompt, load_template};

/// Per-invocation options resolved from CLI flags.
pub struct CommitOptions {
    pub backend: BackendKind,
    pub manual_topic: String,
    pub repo_dir: PathBuf,
}

/// How the run ended when nothing went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    Declined,
}

/// Run the whole pipeline: capture, reduce, prompt, generate, confirm, commit.
pub async fn run_commit(settings: &Settings, options: &CommitOptions) -> Result<CommitOutcome> {
    let t_start = Instant::now();

    // ── Stage 1: capture the staged changes ──
    let diff = read_staged(settings, || git::staged_diff(&options.repo_dir))?;
    let files = read_staged(settings, || git::staged_files(&options.repo_dir))?;

    if diff.trim().is_empty() {
        bail!("No staged changes. Run: git add <files>");
    }

    // ── Stage 2: bound the diff for the prompt ──
    let digest = reduce(&diff, ReductionPolicy::HardTruncate(settings.max_diff_lines));
    if digest.truncated {
        eprintln!(
            "[warn] Large diff: {} lines, using first {}",
            digest.total_lines, digest.kept_lines
        );
    } else {
        println!("[info] Staged diff size: {} lines", digest.total_lines);
    }

    // The API gets the truncated diff (cost control); local models get a
    // sparse digest of the full diff (better signal, less noise).
    let diff_for_prompt = match options.backend {
        BackendKind::Local => {
            reduce(
                &diff,
                ReductionPolicy::SparseDigest(settings.max_local_changed_lines),
            )
            .text
        }
        BackendKind::Api => digest.text,
    };

    // ── Stage 3: build the prompt ──
    let template = load_template(&config::prompt_template_path());
    let prompt = build_prompt(&template, &files, &diff_for_prompt, &options.manual_topic);

    // ── Stage 4: generate ──
    println!(
        "[info] Generating commit message... Please be patient, this may take 1-3 minutes depending on context length."
    );

    let t_generate = Instant::now();
    let generation = generate(settings, options.backend, &prompt).await?;
    let generate_secs = t_generate.elapsed().as_secs_f64();

    // ── Stage 5: post-process and preview ──
    let message = ensure_topic(&generation.content, &options.manual_topic);

    println!("\n========== AI-generated commit message ==========\n");
    println!("{message}");
    println!("\n================================================\n");
    println!("[info] LLM Inference time: {generate_secs:.2} s");

    if options.backend == BackendKind::Api {
        report_cost(settings, &generation);
    }

    // ── Stage 6: confirm and commit ──
    let choice: String = Input::new()
        .with_prompt("Accept this commit message? [y]es/[n]o/[e]dit")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read confirmation")?;

    let outcome = match choice.trim().to_lowercase().as_str() {
        "y" | "e" => {
            let parsed = split(&message)?;
            git::commit(&options.repo_dir, &parsed, choice.trim().eq_ignore_ascii_case("e"))?;
            println!("[info] Commit created");
            CommitOutcome::Committed
        }
        _ => {
            eprintln!("[warn] Commit aborted");
            CommitOutcome::Declined
        }
    };

    println!("[info] Total time: {:.2} s", t_start.elapsed().as_secs_f64());
    Ok(outcome)
}

/// Read-side git call with the configured failure policy: strict mode turns
/// errors into hard failures, otherwise they degrade to an empty result and
/// the empty-diff check reports the situation.
fn read_staged<T: Default>(
    settings: &Settings,
    read: impl FnOnce() -> Result<T, crate::error::VcsError>,
) -> Result<T> {
    match read() {
        Ok(value) => Ok(value),
        Err(e) if settings.strict_git => Err(e).context("Failed to read staged changes"),
        Err(e) => {
            warn!("Ignoring git read failure: {e}");
            Ok(T::default())
        }
    }
}

/// Dispatch to the selected backend and print its lifecycle details.
async fn generate(
    settings: &Settings,
    backend: BackendKind,
    prompt: &str,
) -> Result<Generation> {
    match backend {
        BackendKind::Api => {
            let api = ApiBackend::from_settings(settings)?;
            println!("[info] Using remote API backend ({})", settings.api_model);
            Ok(api.generate(prompt).await?)
        }
        BackendKind::Local => {
            println!(
                "[info] Using local Ollama backend ({})",
                settings.local_model
            );
            let local = LocalBackend::from_settings(settings)?;
            let run = local.run(prompt).await?;

            if run.server_started {
                println!("[info] Ollama server started in the background");
            }

            let t = run.timings;
            println!(
                "[info] Local timing (s): pull={:.2}, server_start={:.2}, wait_ready={:.2}, inference={:.2}, total_local={:.2}",
                t.pull.as_secs_f64(),
                t.server_start.as_secs_f64(),
                t.wait_ready.as_secs_f64(),
                t.inference.as_secs_f64(),
                t.total.as_secs_f64()
            );

            Ok(run.generation)
        }
    }
}

/// Print token counts and estimated cost when the model is priced.
fn report_cost(settings: &Settings, generation: &Generation) {
    let table = cost::load_table(&config::pricing_path());
    if let Some(est) = cost::estimate(&settings.api_model, &generation.usage, &table) {
        println!(
            "[info] Tokens: prompt={}, completion={}, total={}",
            est.prompt_tokens, est.completion_tokens, est.total_tokens
        );
        println!("[info] Estimated cost: ${:.6}", est.cost_usd);
    }
}
