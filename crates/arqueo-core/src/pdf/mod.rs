//! PDF processing module.
//!
//! Text rendering and word geometry for the report extractor. Both are
//! adapters around `lopdf`/`pdf-extract`; the extraction core only sees the
//! resulting text and tokens.

mod extractor;
mod geometry;

pub use extractor::{PdfContent, PdfExtractor};
pub use geometry::{PdfGeometry, tokens_from_operations};

use crate::error::PdfError;

/// Type of PDF content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfType {
    /// Contains extractable text.
    Text,
    /// No usable text layer (scanned or empty document).
    Empty,
}

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Analyze the PDF to determine its type.
    fn analyze(&self) -> PdfType;

    /// Extract the page-ordered text of the entire PDF.
    fn extract_text(&self) -> Result<String>;
}
