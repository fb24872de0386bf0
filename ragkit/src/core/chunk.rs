use super::document::Document;
use crate::{config::DocumentConfig, error::RagError, map_err};
use chunx::{ParagraphChunker, SentenceWindow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Chunking strategies selectable through configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkerKind {
    /// Character window snapping to sentence endings.
    #[default]
    Sentence,

    /// Markdown paragraphs, headers attached to the following paragraph.
    Paragraph,
}

/// Splits documents into chunks small enough to embed.
#[derive(Debug, Clone)]
pub enum Splitter {
    Sentence(SentenceWindow),
    Paragraph(ParagraphChunker),
}

impl Splitter {
    pub fn new(config: &DocumentConfig) -> Result<Self, RagError> {
        Ok(match config.chunker {
            ChunkerKind::Sentence => Self::Sentence(map_err!(SentenceWindow::new(
                config.chunk_size,
                config.chunk_overlap
            ))),
            ChunkerKind::Paragraph => Self::Paragraph(ParagraphChunker),
        })
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        match self {
            Self::Sentence(window) => window.chunk(text),
            Self::Paragraph(paragraph) => paragraph.chunk(text),
        }
    }

    /// Split `document` into chunks that inherit its metadata and source.
    /// Every chunk additionally records `chunk_index`, `total_chunks`
    /// and `chunk_size`.
    pub fn split_document(&self, document: &Document) -> Vec<Document> {
        let chunks = self.split_text(&document.content);
        let total = chunks.len();

        debug!("Split {document} into {total} chunk(s)");

        chunks
            .into_iter()
            .enumerate()
            .map(|(i, content)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), i.into());
                metadata.insert("total_chunks".to_string(), total.into());
                metadata.insert("chunk_size".to_string(), content.chars().count().into());
                Document {
                    content,
                    metadata,
                    source: document.source.clone(),
                }
            })
            .collect()
    }
}
