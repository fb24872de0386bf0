use crate::{
    core::document::{file_type, Document, DocumentProcessor},
    error::RagError,
    map_err,
};
use lopdf::Object;
use serde_json::Map;
use std::{fmt::Write, path::Path, time::Instant};
use tracing::debug;

/// Extracts the text of every page of a PDF.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfProcessor;

impl DocumentProcessor for PdfProcessor {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".pdf"]
    }

    fn process(&self, path: &Path) -> Result<Document, RagError> {
        let start = Instant::now();

        let input = map_err!(lopdf::Document::load(path));
        let pages = input.get_pages();

        let mut out = String::new();
        for page_num in pages.keys() {
            let text = map_err!(input.extract_text(&[*page_num]));
            let _ = writeln!(out, "{text}");
        }

        let mut metadata = Map::new();
        metadata.insert("file_type".to_string(), file_type(path).into());
        metadata.insert("page_count".to_string(), pages.len().into());
        for (key, field) in [("title", "Title"), ("author", "Author"), ("subject", "Subject")] {
            metadata.insert(key.to_string(), info_field(&input, field.as_bytes()).into());
        }

        debug!(
            "Finished processing PDF with {} page(s), took {}ms",
            pages.len(),
            Instant::now().duration_since(start).as_millis()
        );

        Ok(Document::new(out, metadata, path.to_str()))
    }
}

/// Read a string entry from the document information dictionary.
/// Absent entries yield an empty string.
fn info_field(doc: &lopdf::Document, key: &[u8]) -> String {
    doc.trailer
        .get(b"Info")
        .ok()
        .and_then(|info| match info {
            Object::Reference(id) => doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        })
        .and_then(|dict| dict.get(key).ok())
        .and_then(|value| value.as_str().ok())
        .map(decode_text_string)
        .unwrap_or_default()
}

/// PDF text strings are either UTF-16BE with a byte order mark or a single byte encoding.
fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|b| *b as char).collect(),
    }
}
