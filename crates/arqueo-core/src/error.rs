//! Error types for the arqueo-core library.

use thiserror::Error;

/// Main error type for the arqueo library.
#[derive(Error, Debug)]
pub enum ArqueoError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Report extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to walk a page content stream for token geometry.
    #[error("failed to extract geometry: {0}")]
    Geometry(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors related to report field extraction.
///
/// Only input that cannot be used at all is an error. Missing fields, a
/// missing grand-total anchor and failed reconciliation are reported through
/// the returned record instead.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The report text is empty or whitespace only.
    #[error("report text is empty")]
    EmptyInput,
}

/// Result type for the arqueo library.
pub type Result<T> = std::result::Result<T, ArqueoError>;
