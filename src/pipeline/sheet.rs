//! Workbook round-trip: extraction to markdown and best-effort reverse
//! conversion.
//!
//! Extraction uses calamine (`.xlsx` and legacy `.xls` via auto-detection);
//! each sheet becomes a `## Sheet: <name>` section followed by a pipe grid.
//! Empty cells render as empty strings, never a null token.
//!
//! The reverse direction has no faithful markdown-table parser: the naive
//! tier splits each non-blank line on pipes into a single-sheet grid, losing
//! everything else. The raw tier preserves the whole completion as one blob
//! so nothing is ever dropped.

use crate::error::DocfillError;
use crate::format::DocumentFormat;
use crate::pipeline::postprocess::is_separator_row;
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook;
use std::path::Path;

// ── Extraction ───────────────────────────────────────────────────────────

/// Extract a workbook into normalized markdown, one section per sheet.
pub fn extract_workbook(path: &Path) -> Result<String, DocfillError> {
    if !path.exists() {
        return Err(DocfillError::TemplateNotFound {
            path: path.to_path_buf(),
        });
    }
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| extraction_error(format!("opening workbook: {e}")))?;

    let sheet_names = workbook.sheet_names().to_owned();
    let mut sections: Vec<String> = Vec::with_capacity(sheet_names.len());

    for name in &sheet_names {
        let range = workbook
            .worksheet_range(name)
            .map_err(|e| extraction_error(format!("sheet '{name}': {e}")))?;

        let mut section = format!("## Sheet: {name}");
        let grid = render_sheet_grid(range.rows());
        if !grid.is_empty() {
            section.push_str("\n\n");
            section.push_str(&grid);
        }
        sections.push(section);
    }

    Ok(sections.join("\n\n"))
}

fn extraction_error(detail: String) -> DocfillError {
    DocfillError::ExtractionFailed {
        format: DocumentFormat::Tabular,
        detail,
    }
}

/// Display form of one cell; empty and error cells render as `""`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}

/// Render rows as a pipe grid: first row as header, separator, data rows.
fn render_sheet_grid<'a>(rows: impl Iterator<Item = &'a [Data]>) -> String {
    let mut lines: Vec<String> = Vec::new();
    for row in rows {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        lines.push(format!("| {} |", cells.join(" | ")));
        if lines.len() == 1 {
            lines.push(format!("|{}", " --- |".repeat(cells.len().max(1))));
        }
    }
    lines.join("\n")
}

// ── Rendering ────────────────────────────────────────────────────────────

/// Naive tier: split each non-blank line on pipes into one sheet.
///
/// Separator rows are dropped; every other line becomes a row, pipe-free
/// lines included (as single-cell rows). Structure beyond the grid is lost.
pub fn render_sheet(markdown: &str, output_path: &Path) -> Result<(), DocfillError> {
    let rows: Vec<Vec<String>> = markdown
        .lines()
        .filter(|line| !line.trim().is_empty() && !is_separator_row(line))
        .map(split_pipe_line)
        .collect();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name("Sheet1")
        .map_err(|e| render_error(format!("sheet name: {e}")))?;

    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (Ok(r), Ok(c)) = (u32::try_from(r), u16::try_from(c)) else {
                // Grid exceeds the worksheet bounds; the raw tier takes over.
                return Err(render_error("grid exceeds worksheet bounds".into()));
            };
            sheet
                .write_string(r, c, cell)
                .map_err(|e| render_error(format!("cell ({r},{c}): {e}")))?;
        }
    }

    workbook
        .save(output_path)
        .map_err(|e| render_error(format!("saving workbook: {e}")))?;
    Ok(())
}

/// Raw tier: a label row plus the whole completion as one unparsed blob.
pub fn render_sheet_raw(markdown: &str, output_path: &Path) -> Result<(), DocfillError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name("Markdown_Output")
        .map_err(|e| render_error(format!("sheet name: {e}")))?;
    sheet
        .write_string(0, 0, "Markdown Content")
        .map_err(|e| render_error(format!("label cell: {e}")))?;
    sheet
        .write_string(1, 0, markdown)
        .map_err(|e| render_error(format!("content cell: {e}")))?;
    workbook
        .save(output_path)
        .map_err(|e| render_error(format!("saving workbook: {e}")))?;
    Ok(())
}

fn render_error(detail: String) -> DocfillError {
    DocfillError::Internal(format!("workbook render: {detail}"))
}

fn split_pipe_line(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed
        .trim_start_matches('|')
        .trim_end_matches('|');
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_text_renders_empty_cells_as_empty_strings() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("Q1".into())), "Q1");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::Bool(true)), "true");
    }

    #[test]
    fn grid_has_header_separator_then_rows() {
        let rows: Vec<Vec<Data>> = vec![
            vec![Data::String("Q1".into()), Data::String("Q2".into())],
            vec![Data::String("a".into()), Data::Empty],
        ];
        let grid = render_sheet_grid(rows.iter().map(Vec::as_slice));
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines[0], "| Q1 | Q2 |");
        assert_eq!(lines[1], "| --- | --- |");
        assert_eq!(lines[2], "| a |  |");
    }

    #[test]
    fn single_row_sheet_is_header_plus_separator() {
        let rows: Vec<Vec<Data>> =
            vec![vec![Data::String("Q1".into()), Data::String("Q2".into())]];
        let grid = render_sheet_grid(rows.iter().map(Vec::as_slice));
        assert_eq!(grid, "| Q1 | Q2 |\n| --- | --- |");
    }

    #[test]
    fn pipe_split_is_naive_by_design() {
        assert_eq!(split_pipe_line("| a | b |"), vec!["a", "b"]);
        assert_eq!(split_pipe_line("no pipes here"), vec!["no pipes here"]);
        assert_eq!(split_pipe_line("a | b"), vec!["a", "b"]);
    }
}
