//! DOCX round-trip: extraction to markdown and reverse conversion.
//!
//! Reading is manual ZIP + XML parsing of `word/document.xml` — docx-rs is
//! writer-only. Body paragraphs are classified as headings or plain text via
//! an explicit style-id mapping; tables are collected separately and appended
//! after the paragraph stream behind a `--- Tables ---` marker so the block
//! boundary is recoverable on the way back.
//!
//! Writing uses docx-rs. The faithful tier parses the markdown into blocks
//! (headings, pipe tables, paragraphs) and emits named heading styles; when a
//! style reference is supplied, its `word/styles.xml` and theme are spliced
//! into the produced archive so the output picks up the customer's fonts and
//! heading styles. The minimal tier writes blank-line chunks as unstyled
//! paragraphs; tables and headings lose their structure there.

use crate::error::DocfillError;
use crate::format::DocumentFormat;
use crate::pipeline::postprocess::{is_separator_row, is_table_row};
use docx_rs::{Docx, Paragraph, Run, Style, StyleType, Table, TableCell, TableRow};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Marker line separating the paragraph stream from the rendered tables.
pub const TABLES_MARKER: &str = "--- Tables ---";

// ── Extraction ───────────────────────────────────────────────────────────

/// Extract a `.docx` file into normalized markdown.
pub fn extract_docx(path: &Path) -> Result<String, DocfillError> {
    let file = open_input(path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| extraction_error(format!("not a DOCX archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| extraction_error(format!("missing word/document.xml: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| extraction_error(format!("reading word/document.xml: {e}")))?;

    markdown_from_document_xml(&xml)
}

fn open_input(path: &Path) -> Result<File, DocfillError> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DocfillError::TemplateNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => DocfillError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => extraction_error(e.to_string()),
    })
}

fn extraction_error(detail: String) -> DocfillError {
    DocfillError::ExtractionFailed {
        format: DocumentFormat::RichDocument,
        detail,
    }
}

/// Heading level for a paragraph style id.
///
/// Explicit mapping: `Title` is level 1; `Heading<digits>` keeps its digits
/// when they fall in 1–6 and defaults to 1 otherwise (including unparseable
/// level tokens). Every other style is body text.
fn heading_level(style_id: &str) -> Option<u8> {
    let lower = style_id.to_ascii_lowercase();
    if lower == "title" {
        return Some(1);
    }
    let rest = lower.strip_prefix("heading")?;
    let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.parse::<u8>() {
        Ok(level) if (1..=6).contains(&level) => Some(level),
        _ => Some(1),
    }
}

fn get_attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Walk `word/document.xml` and render the paragraph stream plus tables.
///
/// Paragraphs inside table cells belong to the cell, never to the body
/// stream; nested tables flatten into their outer cell's text.
pub(crate) fn markdown_from_document_xml(xml: &str) -> Result<String, DocfillError> {
    let mut reader = Reader::from_str(xml);

    let mut blocks: Vec<String> = Vec::new();
    let mut tables: Vec<Vec<Vec<String>>> = Vec::new();

    let mut table_depth = 0usize;
    let mut in_text = false;
    let mut para_text = String::new();
    let mut para_style: Option<String> = None;
    let mut cell_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:tbl" => {
                    table_depth += 1;
                    if table_depth == 1 {
                        tables.push(Vec::new());
                    }
                }
                b"w:tr" if table_depth == 1 => {
                    if let Some(table) = tables.last_mut() {
                        table.push(Vec::new());
                    }
                }
                b"w:tc" if table_depth == 1 => cell_text.clear(),
                b"w:p" => {
                    if table_depth == 0 {
                        para_text.clear();
                        para_style = None;
                    } else if !cell_text.is_empty() {
                        // Paragraph break inside a cell flattens to a space.
                        cell_text.push(' ');
                    }
                }
                b"w:pStyle" => {
                    if table_depth == 0 {
                        para_style = get_attr(&e, b"w:val");
                    }
                }
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:pStyle" => {
                    if table_depth == 0 {
                        para_style = get_attr(&e, b"w:val");
                    }
                }
                b"w:tab" => current_text(table_depth, &mut para_text, &mut cell_text).push('\t'),
                b"w:br" | b"w:cr" => {
                    // Line breaks inside cells would corrupt the pipe grid.
                    let sep = if table_depth == 0 { '\n' } else { ' ' };
                    current_text(table_depth, &mut para_text, &mut cell_text).push(sep);
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if in_text {
                    let text = t
                        .unescape()
                        .map_err(|e| extraction_error(format!("XML text: {e}")))?;
                    current_text(table_depth, &mut para_text, &mut cell_text).push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" if table_depth == 0 => {
                    let rendered = match para_style.as_deref().and_then(heading_level) {
                        Some(level) => {
                            format!("{} {}", "#".repeat(level as usize), para_text.trim())
                        }
                        None => para_text.clone(),
                    };
                    blocks.push(rendered);
                }
                b"w:tc" if table_depth == 1 => {
                    if let Some(row) = tables.last_mut().and_then(|t| t.last_mut()) {
                        row.push(cell_text.trim().to_string());
                    }
                }
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(extraction_error(format!("XML parse: {e}"))),
        }
    }

    if !tables.is_empty() {
        blocks.push(TABLES_MARKER.to_string());
        for (i, table) in tables.iter().enumerate() {
            blocks.push(format!("**Table {}**", i + 1));
            blocks.push(render_table_grid(table));
        }
    }

    Ok(blocks.join("\n\n"))
}

fn current_text<'a>(
    table_depth: usize,
    para_text: &'a mut String,
    cell_text: &'a mut String,
) -> &'a mut String {
    if table_depth == 0 {
        para_text
    } else {
        cell_text
    }
}

/// Render a table as a pipe grid: header row, separator, data rows.
pub(crate) fn render_table_grid(table: &[Vec<String>]) -> String {
    let Some(header) = table.first() else {
        return String::new();
    };
    let mut lines = Vec::with_capacity(table.len() + 1);
    lines.push(format!("| {} |", header.join(" | ")));
    lines.push(format!("|{}", " --- |".repeat(header.len().max(1))));
    for row in &table[1..] {
        lines.push(format!("| {} |", row.join(" | ")));
    }
    lines.join("\n")
}

// ── Markdown block parsing (reverse direction) ───────────────────────────

/// A structural block recovered from the completion markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Block {
    Heading { level: u8, text: String },
    Table(Vec<Vec<String>>),
    Paragraph(String),
}

/// Split a pipe row into trimmed cell texts.
fn split_row(line: &str) -> Vec<String> {
    let inner = line.trim().trim_start_matches('|').trim_end_matches('|');
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

/// Parse markdown into headings, tables, and paragraphs.
///
/// Everything that is not a heading or a pipe-table row joins the current
/// paragraph; soft-wrapped lines collapse to spaces.
pub(crate) fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut table: Vec<Vec<String>> = Vec::new();

    let flush_paragraph = |paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>| {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
    };
    let flush_table = |table: &mut Vec<Vec<String>>, blocks: &mut Vec<Block>| {
        if !table.is_empty() {
            blocks.push(Block::Table(std::mem::take(table)));
        }
    };

    for line in markdown.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_table(&mut table, &mut blocks);
            continue;
        }

        if is_table_row(trimmed) {
            flush_paragraph(&mut paragraph, &mut blocks);
            if !is_separator_row(trimmed) {
                table.push(split_row(trimmed));
            }
            continue;
        }
        flush_table(&mut table, &mut blocks);

        let hashes = trimmed.chars().take_while(|&c| c == '#').count();
        if (1..=6).contains(&hashes) && trimmed.chars().nth(hashes) == Some(' ') {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(Block::Heading {
                level: hashes as u8,
                text: trimmed[hashes + 1..].trim().to_string(),
            });
            continue;
        }

        paragraph.push(trimmed);
    }

    flush_paragraph(&mut paragraph, &mut blocks);
    flush_table(&mut table, &mut blocks);
    blocks
}

// ── Rendering ────────────────────────────────────────────────────────────

/// Faithful tier: markdown blocks to a styled DOCX at `output_path`.
///
/// When `style_reference` points at a readable `.docx`, its style and theme
/// parts are spliced into the produced archive afterwards. Splice failures
/// keep the unspliced file — styling is cosmetic, content is not.
pub fn render_docx(
    markdown: &str,
    output_path: &Path,
    style_reference: Option<&Path>,
) -> Result<(), DocfillError> {
    let mut docx = base_docx();

    for block in parse_blocks(markdown) {
        docx = match block {
            Block::Heading { level, text } => docx.add_paragraph(
                Paragraph::new()
                    .style(&format!("Heading{level}"))
                    .add_run(Run::new().add_text(text)),
            ),
            Block::Paragraph(text) => {
                docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)))
            }
            Block::Table(rows) => {
                let rows = rows
                    .into_iter()
                    .map(|cells| {
                        TableRow::new(
                            cells
                                .into_iter()
                                .map(|cell| {
                                    TableCell::new().add_paragraph(
                                        Paragraph::new().add_run(Run::new().add_text(cell)),
                                    )
                                })
                                .collect(),
                        )
                    })
                    .collect();
                docx.add_table(Table::new(rows))
            }
        };
    }

    pack_docx(docx, output_path)?;

    if let Some(reference) = style_reference {
        let usable = reference.extension().and_then(|e| e.to_str()) == Some("docx")
            && reference.exists();
        if usable {
            match splice_style_parts(output_path, reference) {
                Ok(()) => debug!("Applied style reference {}", reference.display()),
                Err(e) => tracing::warn!(
                    "Style reference {} not applied: {e}",
                    reference.display()
                ),
            }
        }
    }

    Ok(())
}

/// Minimal tier: each blank-line chunk becomes one unstyled paragraph.
pub fn render_docx_plain(markdown: &str, output_path: &Path) -> Result<(), DocfillError> {
    let mut docx = Docx::new();
    for chunk in markdown.split("\n\n") {
        let text = chunk.trim();
        if text.is_empty() {
            continue;
        }
        docx = docx.add_paragraph(
            Paragraph::new().add_run(Run::new().add_text(text.replace('\n', " "))),
        );
    }
    pack_docx(docx, output_path)
}

fn base_docx() -> Docx {
    // Half-point sizes; Word maps the ids onto the template's own styles
    // once the style reference is spliced in.
    let sizes: [usize; 6] = [36, 32, 28, 26, 24, 22];
    let mut docx = Docx::new();
    for (i, size) in sizes.iter().enumerate() {
        let level = i + 1;
        docx = docx.add_style(
            Style::new(format!("Heading{level}"), StyleType::Paragraph)
                .name(format!("Heading {level}"))
                .size(*size)
                .bold(),
        );
    }
    docx
}

fn pack_docx(docx: Docx, path: &Path) -> Result<(), DocfillError> {
    let file = File::create(path).map_err(|e| DocfillError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    docx.build()
        .pack(file)
        .map_err(|e| DocfillError::Internal(format!("packing DOCX archive: {e}")))?;
    Ok(())
}

/// Copy `word/styles.xml` and the theme from the reference archive into the
/// produced one, rewriting it in place.
fn splice_style_parts(produced: &Path, reference: &Path) -> Result<(), DocfillError> {
    const STYLE_PARTS: [&str; 2] = ["word/styles.xml", "word/theme/theme1.xml"];

    let internal = |detail: String| DocfillError::Internal(detail);

    let mut replacements: HashMap<String, Vec<u8>> = HashMap::new();
    {
        let file = File::open(reference).map_err(|e| internal(format!("open reference: {e}")))?;
        let mut archive =
            ZipArchive::new(file).map_err(|e| internal(format!("read reference: {e}")))?;
        for name in STYLE_PARTS {
            if let Ok(mut entry) = archive.by_name(name) {
                let mut data = Vec::with_capacity(entry.size() as usize);
                entry
                    .read_to_end(&mut data)
                    .map_err(|e| internal(format!("read {name}: {e}")))?;
                replacements.insert(name.to_string(), data);
            }
        }
    }
    if replacements.is_empty() {
        return Ok(());
    }

    let mut entries: Vec<(String, Vec<u8>, bool)> = Vec::new();
    {
        let file = File::open(produced).map_err(|e| internal(format!("reopen output: {e}")))?;
        let mut archive =
            ZipArchive::new(file).map_err(|e| internal(format!("read output: {e}")))?;
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| internal(format!("output entry: {e}")))?;
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut data)
                .map_err(|e| internal(format!("read output entry: {e}")))?;
            entries.push((entry.name().to_string(), data, entry.is_dir()));
        }
    }

    let file = File::create(produced).map_err(|e| internal(format!("rewrite output: {e}")))?;
    let mut writer = ZipWriter::new(file);
    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data, is_dir) in entries {
        if is_dir || name.ends_with('/') {
            writer
                .add_directory(&name, opts)
                .map_err(|e| internal(format!("zip dir {name}: {e}")))?;
            continue;
        }
        let data = replacements.get(&name).cloned().unwrap_or(data);
        writer
            .start_file(&name, opts)
            .map_err(|e| internal(format!("zip file {name}: {e}")))?;
        std::io::Write::write_all(&mut writer, &data)
            .map_err(|e| internal(format!("zip write {name}: {e}")))?;
    }
    writer
        .finish()
        .map_err(|e| internal(format!("finish zip: {e}")))?;
    Ok(())
}
