//! Batch report extraction module.

mod parser;
pub mod rules;
pub mod spatial;
pub mod totals;

pub use parser::ReportParser;
pub use spatial::{BoundingBox, GeometryProvider, Section, SpatialLocator, Token};
pub use totals::{ReconcileOutcome, Reconciliation, SubTotals, Tier, TierFailure, TotalsReconciler};

use crate::error::ExtractionError;
use crate::models::record::ReportRecord;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Trait for batch report extractors.
pub trait ReportExtractor {
    /// Extract a record from already-rendered report text.
    fn extract_from_text(&self, text: &str) -> Result<ReportRecord>;

    /// Render a PDF and extract a record from it. The document bytes are
    /// also offered to the spatial fallback.
    fn extract_from_pdf(&self, data: &[u8]) -> crate::Result<ReportRecord>;
}
