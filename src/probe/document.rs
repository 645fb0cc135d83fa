//! Document metadata extraction for PDFs, spreadsheets, Word documents,
//! and plain-text formats.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xls, Xlsx};
use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};

use crate::records::{AttrMap, Value};

/// Spreadsheet text accumulation stops past this point; word counts on
/// giant workbooks are an estimate, not a transcript.
const MAX_TEXT_LENGTH: usize = 500_000;

/// Characters of extracted text treated as one page when the format
/// carries no explicit page count.
const CHARS_PER_PAGE: usize = 3000;

const PLAIN_TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".markdown", ".csv", ".json", ".xml", ".html", ".htm", ".tex", ".bib", ".log",
];

pub(crate) fn extract(path: &Path, extension: &str) -> Result<AttrMap, String> {
    match extension {
        ".pdf" => extract_pdf(path),
        ".xlsx" | ".xlsm" => extract_spreadsheet::<Xlsx<_>>(path),
        ".xls" => extract_spreadsheet::<Xls<_>>(path),
        ".docx" => extract_docx(path),
        ext if PLAIN_TEXT_EXTENSIONS.contains(&ext) => extract_plain_text(path),
        _ => Ok(AttrMap::new()),
    }
}

/// The PDF parser is known to panic on malformed font tables, so the
/// call is isolated behind `catch_unwind`.
fn extract_pdf(path: &Path) -> Result<AttrMap, String> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read PDF {}: {}", path.display(), e))?;

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(&bytes)
    }));
    let text = match outcome {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => return Err(format!("Failed to parse PDF {}: {}", path.display(), e)),
        Err(_) => return Err(format!("PDF parser panicked on {}", path.display())),
    };

    let mut attrs = AttrMap::new();
    insert_text_stats(&mut attrs, &text);
    let pages = (text.chars().count() / CHARS_PER_PAGE).max(1);
    attrs.insert("pages".to_string(), Value::Int(pages as i64));
    Ok(attrs)
}

fn extract_spreadsheet<R>(path: &Path) -> Result<AttrMap, String>
where
    R: Reader<std::io::BufReader<std::fs::File>>,
    R::Error: std::fmt::Display,
{
    let mut workbook: R = open_workbook(path)
        .map_err(|e| format!("Failed to open workbook {}: {}", path.display(), e))?;

    let sheet_names = workbook.sheet_names().to_owned();
    let mut text = String::new();
    let mut rows = 0usize;
    'sheets: for name in &sheet_names {
        let range = match workbook.worksheet_range(name) {
            Ok(range) => range,
            Err(_) => continue,
        };
        rows += range.height();
        for row in range.rows() {
            for cell in row {
                if matches!(cell, Data::Empty) {
                    continue;
                }
                text.push_str(&cell.to_string());
                text.push(' ');
                if text.len() >= MAX_TEXT_LENGTH {
                    break 'sheets;
                }
            }
        }
    }

    let mut attrs = AttrMap::new();
    attrs.insert("sheet_count".to_string(), Value::Int(sheet_names.len() as i64));
    attrs.insert("rows".to_string(), Value::Int(rows as i64));
    insert_text_stats(&mut attrs, &text);
    Ok(attrs)
}

fn extract_docx(path: &Path) -> Result<AttrMap, String> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read document {}: {}", path.display(), e))?;
    let docx = docx_rs::read_docx(&bytes)
        .map_err(|e| format!("Failed to parse document {}: {}", path.display(), e))?;

    let mut text = String::new();
    let mut paragraphs = 0usize;
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => {
                paragraphs += 1;
                collect_paragraph_text(p, &mut text);
            }
            DocumentChild::Table(t) => collect_table_text(t, &mut paragraphs, &mut text),
            _ => {}
        }
    }

    let mut attrs = AttrMap::new();
    attrs.insert("paragraphs".to_string(), Value::Int(paragraphs as i64));
    insert_text_stats(&mut attrs, &text);
    Ok(attrs)
}

fn collect_paragraph_text(paragraph: &Paragraph, out: &mut String) {
    for child in &paragraph.children {
        match child {
            ParagraphChild::Run(run) => {
                for piece in &run.children {
                    if let RunChild::Text(t) = piece {
                        out.push_str(&t.text);
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => {
                for nested in &link.children {
                    if let ParagraphChild::Run(run) = nested {
                        for piece in &run.children {
                            if let RunChild::Text(t) = piece {
                                out.push_str(&t.text);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        out.push(' ');
    }
    out.push('\n');
}

fn collect_table_text(table: &Table, paragraphs: &mut usize, out: &mut String) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row;
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell;
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(p) => {
                        *paragraphs += 1;
                        collect_paragraph_text(p, out);
                    }
                    TableCellContent::Table(nested) => {
                        collect_table_text(nested, paragraphs, out)
                    }
                    _ => {}
                }
            }
        }
    }
}

fn extract_plain_text(path: &Path) -> Result<AttrMap, String> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read text file {}: {}", path.display(), e))?;

    let (text, encoding) = match String::from_utf8(bytes) {
        Ok(text) => (text, "utf-8"),
        Err(e) => (
            String::from_utf8_lossy(e.as_bytes()).into_owned(),
            "unknown",
        ),
    };

    let mut attrs = AttrMap::new();
    attrs.insert("encoding".to_string(), Value::Text(encoding.to_string()));
    attrs.insert("lines".to_string(), Value::Int(text.lines().count() as i64));
    insert_text_stats(&mut attrs, &text);
    Ok(attrs)
}

fn insert_text_stats(attrs: &mut AttrMap, text: &str) {
    attrs.insert(
        "words".to_string(),
        Value::Int(text.split_whitespace().count() as i64),
    );
    attrs.insert("chars".to_string(), Value::Int(text.chars().count() as i64));
}
