use ragkit_embedders::error::ModelError;
use std::error::Error as _;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum RagErr {
    #[error("Does not exist; {0}")]
    DoesNotExist(String),

    #[error("Entity already exists; {0}")]
    AlreadyExists(String),

    #[error("Invalid file name; {0}")]
    InvalidFileName(String),

    #[error("Unsupported file type; {0}")]
    UnsupportedFileType(String),

    #[error("Invalid embedder; {0}")]
    InvalidEmbedder(String),

    #[error("Dimension mismatch; {0}")]
    DimensionMismatch(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    #[error("parse configuration: {0}")]
    ParseConfig(String),

    #[error("Logging; {0}")]
    Logging(String),

    #[error("model: {0}")]
    Model(#[from] ModelError),

    #[error("chunker: {0}")]
    Chunker(#[from] chunx::ChunkerError),

    #[error("IO; {0}")]
    IO(#[from] std::io::Error),

    #[error("JSON error; {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Parse pdf; {0}")]
    ParsePdf(#[from] lopdf::Error),

    #[error("Docx read; {0}")]
    DocxRead(#[from] docx_rs::ReaderError),

    #[error("Task; {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
#[error("{error}")]
pub struct RagError {
    file: &'static str,
    line: u32,
    column: u32,
    pub error: RagErr,
}

impl RagError {
    pub fn new(file: &'static str, line: u32, column: u32, error: RagErr) -> RagError {
        RagError {
            file,
            line,
            column,
            error,
        }
    }

    pub fn location(&self) -> String {
        format!("{}:{}:{}", self.file, self.line, self.column)
    }

    pub fn print(&self) {
        let location = self.location();

        error!("{location} | {self}");

        if self.error.source().is_some() {
            error!("Causes:");
        }

        let mut src = self.error.source();
        while let Some(source) = src {
            error!(" - {source}");
            src = source.source();
        }
    }
}

#[macro_export]
macro_rules! err {
    ($ty:ident $(, $l:literal $(,)? $($args:expr),* )?) => {
        Err($crate::error::RagError::new(
            file!(),
            line!(),
            column!(),
            $crate::error::RagErr::$ty $( (format!($l, $( $args, )*)) )?,
        ))
    };
}

#[macro_export]
macro_rules! map_err {
    ($ex:expr) => {
        $ex.map_err(|e| $crate::error::RagError::new(file!(), line!(), column!(), e.into()))?
    };
}
