//! Documents and the processors that read them from disk.

use crate::error::RagError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

pub mod loader;
pub mod processor;

/// A piece of text along with its metadata. Both whole files and their chunks
/// are represented as documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: Map<String, Value>,
    pub source: Option<String>,
}

impl Document {
    /// Create a document. When `source` is given, `source` and `file_size`
    /// are recorded in the metadata.
    pub fn new(content: impl Into<String>, mut metadata: Map<String, Value>, source: Option<&str>) -> Self {
        if let Some(source) = source {
            let file_size = std::fs::metadata(source).map(|m| m.len()).unwrap_or(0);
            metadata.insert("source".to_string(), source.into());
            metadata.insert("file_size".to_string(), file_size.into());
        }

        Self {
            content: content.into(),
            metadata,
            source: source.map(String::from),
        }
    }

    /// The source recorded in the metadata, falling back to [Self::source].
    pub fn source(&self) -> Option<&str> {
        self.metadata
            .get("source")
            .and_then(Value::as_str)
            .or(self.source.as_deref())
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Document(source={}, content_length={})",
            self.source.as_deref().unwrap_or("None"),
            self.content.chars().count()
        )
    }
}

/// Reads a single file format into a [Document].
pub trait DocumentProcessor: Send + Sync {
    /// Processor name used in log output.
    fn name(&self) -> &'static str;

    /// Lowercase extensions, including the leading dot.
    fn extensions(&self) -> &'static [&'static str];

    fn can_process(&self, path: &Path) -> bool {
        extension(path).is_some_and(|ext| self.extensions().contains(&ext.as_str()))
    }

    fn process(&self, path: &Path) -> Result<Document, RagError>;
}

/// The lowercased extension of `path`, with a leading dot.
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// The extension of `path` as written, with a leading dot.
pub(crate) fn file_type(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn document_records_source_and_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        let path = file.path().to_str().unwrap();

        let doc = Document::new("hello", Map::new(), Some(path));

        assert_eq!(Some(path), doc.source());
        assert_eq!(Some(&Value::from(5)), doc.metadata.get("file_size"));
        assert_eq!(format!("Document(source={path}, content_length=5)"), doc.to_string());
    }

    #[test]
    fn document_missing_file_has_zero_size() {
        let doc = Document::new("x", Map::new(), Some("/no/such/file.txt"));
        assert_eq!(Some(&Value::from(0)), doc.metadata.get("file_size"));
    }

    #[test]
    fn document_without_source() {
        let doc = Document::new("text", Map::new(), None);
        assert!(doc.metadata.is_empty());
        assert_eq!(None, doc.source());
        assert_eq!("Document(source=None, content_length=4)", doc.to_string());
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(Some(".md".to_string()), extension(Path::new("a/README.MD")));
        assert_eq!(None, extension(Path::new("Makefile")));
        assert_eq!(".MD", file_type(Path::new("README.MD")));
    }
}
