//! Diff reduction: bound the staged diff before it becomes prompt content.

/// How to shrink a diff that exceeds its prompt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionPolicy {
    /// Keep the first N lines verbatim and note how many were dropped.
    HardTruncate(usize),
    /// Keep every file and hunk header, plus at most N changed lines.
    ///
    /// Context lines are dropped entirely. This trades surrounding code for
    /// headers and changes, which is the better deal for small local models.
    ///
    /// The cutoff fires after a changed line is kept, so a limit of zero
    /// still keeps the first changed line.
    SparseDigest(usize),
}

/// A reduced diff plus bookkeeping about what was dropped.
///
/// `kept_lines` counts input lines carried into `text` (marker lines are not
/// input), so `kept_lines <= total_lines` always holds and `truncated` is
/// exactly `kept_lines < total_lines`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffDigest {
    pub text: String,
    pub truncated: bool,
    pub total_lines: usize,
    pub kept_lines: usize,
}

/// Reduce `diff` under the given policy.
///
/// Pure and deterministic: the same input and policy always produce the same
/// digest, no matter how often it runs.
pub fn reduce(diff: &str, policy: ReductionPolicy) -> DiffDigest {
    match policy {
        ReductionPolicy::HardTruncate(max_lines) => hard_truncate(diff, max_lines),
        ReductionPolicy::SparseDigest(max_changed_lines) => sparse_digest(diff, max_changed_lines),
    }
}

/// First `max_lines` lines verbatim; anything longer gets a trailing marker.
fn hard_truncate(diff: &str, max_lines: usize) -> DiffDigest {
    let total_lines = diff.lines().count();

    if total_lines <= max_lines {
        return DiffDigest {
            text: diff.to_string(),
            truncated: false,
            total_lines,
            kept_lines: total_lines,
        };
    }

    let omitted = total_lines - max_lines;
    let kept: Vec<&str> = diff.lines().take(max_lines).collect();

    let mut text = kept.join("\n");
    text.push_str("\n\n");
    text.push_str(&format!("[... truncated {omitted} diff lines ...]"));

    DiffDigest {
        text,
        truncated: true,
        total_lines,
        kept_lines: max_lines,
    }
}

/// Structural header test: these lines survive sparse reduction unconditionally.
fn is_diff_header(line: &str) -> bool {
    line.starts_with("diff --git ")
        || line.starts_with("index ")
        || line.starts_with("--- ")
        || line.starts_with("+++ ")
        || line.starts_with("@@")
}

/// Added or removed content line (file markers `+++`/`---` excluded).
fn is_changed_line(line: &str) -> bool {
    (line.starts_with('+') || line.starts_with('-'))
        && !line.starts_with("+++")
        && !line.starts_with("---")
}

/// Headers always, changed lines up to budget, context lines never.
///
/// Scanning stops at the changed-line budget, so later headers are dropped
/// too once the marker is emitted.
fn sparse_digest(diff: &str, max_changed_lines: usize) -> DiffDigest {
    let total_lines = diff.lines().count();
    let mut kept: Vec<&str> = Vec::new();
    let mut changed = 0usize;
    let mut hit_limit = false;

    for line in diff.lines() {
        if is_diff_header(line) {
            kept.push(line);
        } else if is_changed_line(line) {
            kept.push(line);
            changed += 1;
            if changed >= max_changed_lines {
                hit_limit = true;
                break;
            }
        }
    }

    let kept_lines = kept.len();
    let mut text = kept.join("\n");
    if hit_limit {
        text.push_str("\n\n");
        text.push_str(&format!(
            "[... truncated after {max_changed_lines} changed lines ...]"
        ));
    }

    DiffDigest {
        text,
        truncated: kept_lines < total_lines,
        total_lines,
        kept_lines,
    }
}
