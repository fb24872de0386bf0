use crate::{
    core::document::{file_type, Document, DocumentProcessor},
    error::RagError,
    map_err,
};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Plain text and markdown files.
#[derive(Debug, Clone)]
pub struct TextProcessor {
    encoding: String,
}

impl TextProcessor {
    /// `encoding` is recorded in the metadata. Content is always decoded as
    /// UTF-8, invalid sequences are replaced.
    pub fn new(encoding: &str) -> Self {
        Self {
            encoding: encoding.to_string(),
        }
    }
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new("utf-8")
    }
}

impl DocumentProcessor for TextProcessor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".txt", ".md"]
    }

    fn process(&self, path: &Path) -> Result<Document, RagError> {
        let bytes = map_err!(std::fs::read(path));
        let content = String::from_utf8_lossy(&bytes).into_owned();

        let mut metadata = Map::new();
        metadata.insert("file_type".to_string(), file_type(path).into());
        metadata.insert("encoding".to_string(), Value::from(self.encoding.as_str()));
        metadata.insert(
            "line_count".to_string(),
            content.split('\n').count().into(),
        );

        debug!("Read {} bytes from {}", bytes.len(), path.display());

        Ok(Document::new(content, metadata, path.to_str()))
    }
}
