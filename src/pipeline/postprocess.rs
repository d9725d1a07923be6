//! Post-processing: deterministic cleanup of the synthesised report.
//!
//! Even a well-prompted model occasionally wraps its whole answer in
//! ` ```markdown ` fences, emits Windows line endings, or leaves runs of
//! blank lines between sections. These rules fix formatting quirks without
//! touching content — the report's wording and structure are returned
//! exactly as the model produced them (no template validation happens
//! here or anywhere else).

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw synthesis output.
///
/// Rules (applied in order):
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Ensure the report ends with exactly one newline
pub fn clean_report(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown)?\n(.*)\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_with_language_tag() {
        let input = "```markdown\n# Report\nBody\n```";
        assert_eq!(strip_markdown_fences(input), "# Report\nBody");
    }

    #[test]
    fn strips_fences_without_language_tag() {
        let input = "```\n# Report\nBody\n```";
        assert_eq!(strip_markdown_fences(input), "# Report\nBody");
    }

    #[test]
    fn unfenced_input_passes_through() {
        let input = "# Report\nBody";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn inner_fences_survive() {
        let input = "# Report\n\n```text\nquoted block\n```\n\nMore";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn normalises_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn collapses_blank_runs() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn exactly_one_final_newline() {
        assert_eq!(ensure_final_newline("report"), "report\n");
        assert_eq!(ensure_final_newline("report\n\n\n"), "report\n");
        assert_eq!(ensure_final_newline(""), "\n");
    }

    #[test]
    fn full_pipeline() {
        let input = "```markdown\n# Technology Transfer Potential Report\r\n\r\n## 1. Project Analysis   \n\n\n\n\ntext\n```";
        let result = clean_report(input);
        assert!(result.starts_with("# Technology Transfer Potential Report"));
        assert!(result.contains("## 1. Project Analysis\n"));
        assert!(result.ends_with("text\n"));
        assert!(!result.contains('\r'));
        assert!(!result.contains("\n\n\n\n"));
    }
}
