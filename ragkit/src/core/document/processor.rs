//! Processors for every supported file format.

pub mod docx;
pub mod pdf;
pub mod text;

pub use docx::DocxProcessor;
pub use pdf::PdfProcessor;
pub use text::TextProcessor;
