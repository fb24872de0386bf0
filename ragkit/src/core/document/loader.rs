use super::{
    extension,
    processor::{DocxProcessor, PdfProcessor, TextProcessor},
    Document, DocumentProcessor,
};
use crate::{config::DocumentConfig, err, error::RagError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Dispatches files to the first processor able to read them.
pub struct DocumentLoader {
    processors: Vec<Box<dyn DocumentProcessor>>,

    /// Lowercased, dot prefixed extensions picked up when loading directories.
    supported_extensions: Vec<String>,
}

impl DocumentLoader {
    pub fn new(config: &DocumentConfig) -> Self {
        Self::with_processors(
            vec![
                Box::new(TextProcessor::new(&config.encoding)),
                Box::new(PdfProcessor),
                Box::new(DocxProcessor),
            ],
            &config.supported_extensions,
        )
    }

    pub fn with_processors(
        processors: Vec<Box<dyn DocumentProcessor>>,
        supported_extensions: &[String],
    ) -> Self {
        let supported_extensions = supported_extensions
            .iter()
            .map(|ext| {
                let ext = ext.to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect();

        Self {
            processors,
            supported_extensions,
        }
    }

    /// Load a single file.
    pub fn load_document(&self, path: &Path) -> Result<Document, RagError> {
        if !path.exists() {
            return err!(DoesNotExist, "File '{}'", path.display());
        }

        let Some(processor) = self.processors.iter().find(|p| p.can_process(path)) else {
            let known: Vec<&str> = self
                .processors
                .iter()
                .flat_map(|p| p.extensions().iter().copied())
                .collect();
            return err!(
                UnsupportedFileType,
                "'{}', supported extensions: {}",
                path.display(),
                known.join(", ")
            );
        };

        debug!("Processing '{}' with {} processor", path.display(), processor.name());

        let document = processor.process(path)?;

        info!(
            "Loaded '{}' ({} characters)",
            path.display(),
            document.content.chars().count()
        );

        Ok(document)
    }

    /// Load every supported file in `dir`. Files that fail to load are
    /// logged and skipped.
    pub fn load_documents(&self, dir: &Path, recursive: bool) -> Result<Vec<Document>, RagError> {
        if !dir.is_dir() {
            return err!(DoesNotExist, "Directory '{}'", dir.display());
        }

        let mut documents = vec![];

        for path in self.supported_files(dir, recursive) {
            match self.load_document(&path) {
                Ok(document) => documents.push(document),
                Err(e) => warn!("Skipping '{}': {e}", path.display()),
            }
        }

        info!("Loaded {} document(s) from '{}'", documents.len(), dir.display());

        Ok(documents)
    }

    fn supported_files(&self, dir: &Path, recursive: bool) -> Vec<PathBuf> {
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .sort_by_file_name();

        walker
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Unable to read directory entry: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                extension(path).is_some_and(|ext| self.supported_extensions.contains(&ext))
            })
            .collect()
    }
}
