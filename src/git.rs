//! Git collaborator: staged-diff reads and the final commit.
//!
//! All operations shell out to the system `git` binary, inheriting the user's
//! existing git config, hooks, and commit signing setup.

use std::path::Path;
use std::process::Command;

use crate::commit::message::CommitMessage;
use crate::error::VcsError;

/// The staged diff, exactly as `git diff --cached` prints it.
pub fn staged_diff(dir: &Path) -> Result<String, VcsError> {
    run_git_capture(dir, &["diff", "--cached"], "diff --cached")
}

/// Paths of all staged files, one per line from `git diff --cached --name-only`.
pub fn staged_files(dir: &Path) -> Result<Vec<String>, VcsError> {
    let out = run_git_capture(
        dir,
        &["diff", "--cached", "--name-only"],
        "diff --cached --name-only",
    )?;
    Ok(out
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Commit the staged changes with the approved message.
///
/// The `-m` arguments come straight from [`CommitMessage::commit_args`], so
/// what was previewed is what gets committed. With `edit` the user's editor
/// opens on the prepared message before the commit lands; `--cleanup=strip`
/// drops comment lines they leave behind. Stdio is inherited so hooks and
/// the editor talk to the terminal.
pub fn commit(dir: &Path, message: &CommitMessage, edit: bool) -> Result<(), VcsError> {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir).arg("commit").args(message.commit_args());

    if edit {
        cmd.arg("--edit").arg("--cleanup=strip");
        if cfg!(windows) && std::env::var_os("GIT_EDITOR").is_none() {
            cmd.env("GIT_EDITOR", "notepad");
        }
    }

    let status = cmd.status().map_err(|source| VcsError::Spawn {
        operation: "commit".to_string(),
        source,
    })?;

    if !status.success() {
        return Err(VcsError::CommitFailed {
            code: status.code().unwrap_or(1),
        });
    }

    Ok(())
}

/// Run a read-only git command and capture stdout.
fn run_git_capture(dir: &Path, args: &[&str], operation: &str) -> Result<String, VcsError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|source| VcsError::Spawn {
            operation: operation.to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VcsError::CommandFailed {
            operation: operation.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
