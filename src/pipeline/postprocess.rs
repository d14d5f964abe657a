//! Deterministic cleanup of the model completion before reverse conversion.
//!
//! Even well-prompted models occasionally wrap the whole answer in
//! ` ```markdown ` fences, emit CRLF line endings, or drop the separator row
//! of a pipe table. The reverse converter parses the markdown structurally,
//! so these quirks are fixed here with cheap string/regex passes rather than
//! more prompt rules.
//!
//! Pass order matters: fences are stripped before anything else so the
//! remaining rules see clean input, and table repair runs after line-ending
//! normalisation so row detection works on `\n`-separated lines.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup passes to the raw completion.
///
/// Each pass is a pure `&str -> String` function with no shared state.
pub fn clean_markdown(input: &str) -> String {
    let s = strip_outer_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = repair_table_separators(&s);
    ensure_final_newline(&s)
}

// ── Fence stripping ──────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown)?\n(.*)\n```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Whitespace normalisation ─────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
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

// ── Table repair ─────────────────────────────────────────────────────────

/// True for a line that reads as a pipe-table row.
pub(crate) fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.ends_with('|') && trimmed.len() > 2
}

/// True for a `| --- | --- |` style separator row.
///
/// At least one dash is required: a row of empty cells (`|  |  |`) is data,
/// not a separator.
pub(crate) fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    if !trimmed.starts_with('|') || !trimmed.contains('-') {
        return false;
    }
    trimmed
        .chars()
        .all(|c| c == '|' || c == '-' || c == ':' || c == ' ')
}

/// Insert a missing separator row after a table's header line.
///
/// Without the separator, downstream markdown consumers treat the whole
/// block as plain text and the table structure is lost on the way back into
/// the native format.
fn repair_table_separators(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut result: Vec<String> = Vec::with_capacity(lines.len() + 4);
    let mut prev_was_table = false;

    for (i, line) in lines.iter().enumerate() {
        result.push((*line).to_string());

        let starts_table = is_table_row(line) && !is_separator_row(line) && !prev_was_table;
        if starts_table {
            let next = lines.get(i + 1).copied().unwrap_or("");
            if is_table_row(next) && !is_separator_row(next) {
                let col_count = line.matches('|').count().saturating_sub(1).max(1);
                let mut sep = String::from("|");
                for _ in 0..col_count {
                    sep.push_str(" --- |");
                }
                result.push(sep);
            }
        }
        prev_was_table = is_table_row(line);
    }

    result.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fenced_wrapper() {
        assert_eq!(strip_outer_fences("```markdown\n# T\nbody\n```"), "# T\nbody");
        assert_eq!(strip_outer_fences("```\n# T\n```"), "# T");
        assert_eq!(strip_outer_fences("# T\nbody"), "# T\nbody");
    }

    #[test]
    fn normalises_crlf() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn collapses_blank_runs() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn final_newline() {
        assert_eq!(ensure_final_newline("x"), "x\n");
        assert_eq!(ensure_final_newline("x\n\n"), "x\n");
        assert_eq!(ensure_final_newline(""), "\n");
    }

    #[test]
    fn inserts_missing_separator() {
        let fixed = repair_table_separators("| A | B |\n| 1 | 2 |");
        let lines: Vec<&str> = fixed.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(is_separator_row(lines[1]));
    }

    #[test]
    fn intact_table_unchanged() {
        let input = "| A | B |\n| --- | --- |\n| 1 | 2 |";
        assert_eq!(repair_table_separators(input), input);
    }

    #[test]
    fn table_row_detection() {
        assert!(is_table_row("| a | b |"));
        assert!(!is_table_row("plain text"));
        assert!(is_separator_row("| --- | :--: |"));
        assert!(!is_separator_row("| a | b |"));
    }

    #[test]
    fn row_of_empty_cells_is_data_not_separator() {
        assert!(!is_separator_row("|  |  |"));
        assert!(!is_separator_row("| | | |"));
        assert!(is_separator_row("|-|-|"));
    }

    #[test]
    fn full_pipeline() {
        let input = "```markdown\n# Title\r\n\r\nSome text   \n\n\n\n\n| A | B |\n| 1 | 2 |\n```";
        let out = clean_markdown(input);
        assert!(out.starts_with("# Title"));
        assert!(out.ends_with('\n'));
        assert!(!out.contains("\n\n\n\n"));
        assert!(out.lines().any(is_separator_row));
    }
}
