use crate::{
    core::document::{extension, file_type, Document, DocumentProcessor},
    err,
    error::RagError,
    map_err,
};
use docx_rs::{read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild, Table};
use serde_json::Map;
use std::{fmt::Write, path::Path, time::Instant};
use tracing::debug;

/// Word documents. Only the OOXML `.docx` format can be read, legacy `.doc`
/// files are recognized so they fail with a meaningful error.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxProcessor;

impl DocumentProcessor for DocxProcessor {
    fn name(&self) -> &'static str {
        "docx"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".docx", ".doc"]
    }

    fn process(&self, path: &Path) -> Result<Document, RagError> {
        if extension(path).as_deref() == Some(".doc") {
            return err!(
                UnsupportedFileType,
                "legacy .doc format is not supported, convert '{}' to .docx",
                path.display()
            );
        }

        let start = Instant::now();

        let bytes = map_err!(std::fs::read(path));
        let input = map_err!(read_docx(&bytes));

        let mut out = String::new();
        let mut paragraph_count = 0;

        for el in input.document.children {
            match el {
                DocumentChild::Paragraph(ref el) => {
                    paragraph_count += 1;
                    let text = extract_paragraph(el).join("");
                    if text.trim().is_empty() {
                        continue;
                    }
                    let _ = writeln!(out, "{text}");
                }
                DocumentChild::Table(ref el) => {
                    let _ = writeln!(out, "{}", extract_table(el));
                }
                _ => {}
            }
        }

        let mut metadata = Map::new();
        metadata.insert("file_type".to_string(), file_type(path).into());
        metadata.insert("paragraph_count".to_string(), paragraph_count.into());
        metadata.insert(
            "word_count".to_string(),
            out.split_whitespace().count().into(),
        );

        debug!(
            "Finished processing DOCX, took {}ms",
            Instant::now().duration_since(start).as_millis()
        );

        Ok(Document::new(out, metadata, path.to_str()))
    }
}

/// Given a DOCX table, create the equivalent table in Markdown style.
fn extract_table(table: &Table) -> String {
    let mut table_out = String::new();

    for row in table.rows.iter() {
        #[allow(irrefutable_let_patterns)]
        let docx_rs::TableChild::TableRow(docx_rs::TableRow { cells, .. }) = row
        else {
            continue;
        };

        let mut row_buf: Vec<String> = vec![];

        for cell in cells.iter() {
            #[allow(irrefutable_let_patterns)]
            let docx_rs::TableRowChild::TableCell(cell) = cell
            else {
                continue;
            };

            let text: Vec<String> = cell
                .children
                .iter()
                .filter_map(|child| match child {
                    docx_rs::TableCellContent::Paragraph(p) => Some(extract_paragraph(p).join("")),
                    _ => None,
                })
                .collect();

            row_buf.push(format!(" {} ", text.join(" ").trim()));
        }

        let _ = writeln!(table_out, "|{}|", row_buf.join("|"));
        let separator: Vec<String> = row_buf.iter().map(|cell| "-".repeat(cell.len())).collect();
        let _ = writeln!(table_out, "|{}|", separator.join("|"));
    }

    table_out
}

fn extract_paragraph(p: &Paragraph) -> Vec<&str> {
    let mut out = vec![];

    for child in p.children.iter() {
        match child {
            ParagraphChild::Run(run) => {
                for rchild in run.children.iter() {
                    let RunChild::Text(t) = rchild else { continue };
                    out.push(t.text.as_str());
                }
            }
            ParagraphChild::Hyperlink(hl) => {
                for rchild in hl.children.iter() {
                    let ParagraphChild::Run(run) = rchild else {
                        continue;
                    };
                    for rchild in run.children.iter() {
                        let RunChild::Text(t) = rchild else { continue };
                        out.push(t.text.as_str());
                    }
                }
            }
            _ => {}
        }
    }

    out
}
