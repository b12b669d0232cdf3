//! Post-processing of model output into a git-safe commit message.

use crate::error::EmptyOutputError;

/// Subject/body pair as it will reach git.
///
/// [`commit_args`](Self::commit_args) is the single source of the `-m`
/// arguments, so the previewed message and the committed one cannot diverge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    pub subject: String,
    pub body: String,
}

impl CommitMessage {
    /// The exact `-m` arguments for `git commit`.
    pub fn commit_args(&self) -> Vec<String> {
        let mut args = vec!["-m".to_string(), self.subject.clone()];
        if !self.body.trim().is_empty() {
            args.push("-m".to_string());
            args.push(self.body.clone());
        }
        args
    }
}

/// Make sure a `Topic: <topic>` line sits right after the subject.
///
/// No-op for an empty topic. If the model already put a `Topic:` line (any
/// case) among the non-blank lines following the subject, the message is
/// left alone, which also makes the function idempotent.
pub fn ensure_topic(message: &str, manual_topic: &str) -> String {
    let topic = manual_topic.trim();
    if topic.is_empty() {
        return message.trim().to_string();
    }

    let lines: Vec<&str> = message.lines().collect();

    let Some(subject_idx) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return message.trim().to_string();
    };

    // Scan the contiguous non-blank block under the subject for an existing
    // Topic line.
    for line in &lines[subject_idx + 1..] {
        if line.trim().is_empty() {
            break;
        }
        if line.trim().to_lowercase().starts_with("topic:") {
            return message.trim().to_string();
        }
    }

    let mut out: Vec<String> = lines[..=subject_idx].iter().map(|l| l.to_string()).collect();
    out.push(format!("Topic: {topic}"));
    out.extend(lines[subject_idx + 1..].iter().map(|l| l.to_string()));
    out.join("\n").trim().to_string()
}

/// Split model output into subject and body.
///
/// Subject is the first non-blank line. The body is everything after it,
/// minus at most one leading blank line (so `-m subject -m body` does not
/// start the body with a blank), right-trimmed.
pub fn split(message: &str) -> Result<CommitMessage, EmptyOutputError> {
    let lines: Vec<&str> = message.lines().collect();

    let subject_idx = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .ok_or(EmptyOutputError)?;

    let mut body_lines = &lines[subject_idx + 1..];
    if let Some((first, rest)) = body_lines.split_first() {
        if first.trim().is_empty() {
            body_lines = rest;
        }
    }

    Ok(CommitMessage {
        subject: lines[subject_idx].to_string(),
        body: body_lines.join("\n").trim_end().to_string(),
    })
}
