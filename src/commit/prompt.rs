//! Prompt construction for the commit-message request.

use std::fs;
use std::io;
use std::path::Path;

use tracing::warn;

/// Built-in prompt template.
///
/// The `{placeholder}` markers are substituted literally by [`build_prompt`];
/// a user override from `prompt.txt` uses the same markers.
const DEFAULT_TEMPLATE: &str = r#"You are an expert software engineer.

Write a Conventional Commit message based on the STAGED DIFF.

Rules:
- Output ONLY the commit message (no commentary, no extra text).
- Subject line: <type>(<optional scope>): <imperative summary>, max 72 chars.
{manual_rules}- Blank line after the subject line (and after Topic line if present).
- Total number of code lines added and removed.
- Blank line.
- Then write the body FIRST under heading "CHANGES:" with 2-8 concise bullet points describing what changed and why. Format clearly with line spacing so it is easy to read.
- Then include a section titled "Files changed:" at the VERY END and include all changed files.

Files:
{files_list}
{manual_block}
STAGED DIFF:
{diff_content}"#;

/// Load the prompt template, preferring a user override at `override_path`.
///
/// A missing file means the built-in default; an unreadable file logs a
/// warning and falls back rather than blocking the commit.
pub fn load_template(override_path: &Path) -> String {
    match fs::read_to_string(override_path) {
        Ok(text) => text.trim().to_string(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => DEFAULT_TEMPLATE.to_string(),
        Err(e) => {
            warn!(
                "Failed to read prompt template {}, using internal default: {e}",
                override_path.display()
            );
            DEFAULT_TEMPLATE.to_string()
        }
    }
}

/// Render the template with the staged file list, the reduced diff, and the
/// optional manual topic.
///
/// Substitution is plain string replacement: file names and diff content land
/// in the prompt verbatim, so the result must be treated as untrusted model
/// input, never re-parsed for placeholders.
pub fn build_prompt(template: &str, files: &[String], diff: &str, manual_topic: &str) -> String {
    let topic = manual_topic.trim();

    let (manual_rules, manual_block) = if topic.is_empty() {
        (String::new(), String::new())
    } else {
        (
            "- You MUST include a one-line 'Topic:' line immediately AFTER the subject line.\n\
             - Format exactly: Topic: <manual_topic>\n"
                .to_string(),
            format!("\nManual commit message topic:\n{topic}\n"),
        )
    };

    template
        .replace("{manual_rules}", &manual_rules)
        .replace("{manual_block}", &manual_block)
        .replace("{files_list}", &files.join("\n"))
        .replace("{diff_content}", diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_prompt_includes_files_and_diff() {
        let prompt = build_prompt(
            DEFAULT_TEMPLATE,
            &files(&["src/auth/login.rs", "src/auth/session.rs"]),
            "+pub fn new_function() {}",
            "",
        );

        assert!(prompt.contains("src/auth/login.rs\nsrc/auth/session.rs"));
        assert!(prompt.contains("+pub fn new_function() {}"));
        assert!(prompt.contains("STAGED DIFF:"));
    }

    #[test]
    fn test_build_prompt_without_topic_has_no_topic_rules() {
        let prompt = build_prompt(DEFAULT_TEMPLATE, &files(&["f.rs"]), "+x", "");

        assert!(!prompt.contains("Topic:"));
        assert!(!prompt.contains("Manual commit message topic"));
        // Placeholders are gone even when their value is empty
        assert!(!prompt.contains("{manual_rules}"));
        assert!(!prompt.contains("{manual_block}"));
    }

    #[test]
    fn test_build_prompt_with_topic_adds_rules_and_block() {
        let prompt = build_prompt(DEFAULT_TEMPLATE, &files(&["f.rs"]), "+x", "JIRA-123");

        assert!(prompt.contains("Format exactly: Topic: <manual_topic>"));
        assert!(prompt.contains("Manual commit message topic:\nJIRA-123"));
    }

    #[test]
    fn test_build_prompt_trims_topic_whitespace() {
        let prompt = build_prompt(DEFAULT_TEMPLATE, &files(&[]), "", "  padded  ");
        assert!(prompt.contains("Manual commit message topic:\npadded\n"));
    }

    #[test]
    fn test_build_prompt_inserts_diff_verbatim() {
        // Braces in the diff must survive untouched
        let diff = "+let x = vec!{1, 2};\n-{old}";
        let prompt = build_prompt(DEFAULT_TEMPLATE, &files(&["f.rs"]), diff, "");
        assert!(prompt.contains(diff));
    }

    #[test]
    fn test_load_template_missing_file_returns_default() {
        let template = load_template(Path::new("/nonexistent/prompt.txt"));
        assert_eq!(template, DEFAULT_TEMPLATE);
    }

    #[test]
    fn test_load_template_reads_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        fs::write(&path, "Custom template\n\n{diff_content}\n").unwrap();

        let template = load_template(&path);
        assert_eq!(template, "Custom template\n\n{diff_content}");

        let prompt = build_prompt(&template, &files(&[]), "+line", "");
        assert_eq!(prompt, "Custom template\n\n+line");
    }
}
