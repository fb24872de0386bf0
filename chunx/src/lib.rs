//! Text chunkers used to prepare documents for embedding.
//!
//! Chunkers here are pure; they take a `&str` and return the chunks without
//! touching the file system or any model.

pub mod paragraph;
pub mod sentence;

pub use paragraph::ParagraphChunker;
pub use sentence::SentenceWindow;

#[derive(Debug, thiserror::Error)]
pub enum ChunkerError {
    #[error("{0}")]
    Config(String),
}
