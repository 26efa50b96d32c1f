//! Core library for cash-settlement batch report extraction.
//!
//! This crate provides:
//! - Locale-ambiguous amount parsing and Argentine currency formatting
//! - Rule-based extraction of batch identity and payment-method breakdown
//! - Multi-tier reconciliation of the two subtotals against the batch total,
//!   with a word-geometry fallback
//! - PDF text and geometry adapters built on lopdf and pdf-extract

pub mod error;
pub mod models;
pub mod pdf;
pub mod report;

pub use error::{ArqueoError, ExtractionError, PdfError, Result};
pub use models::config::{ArqueoConfig, ExtractionConfig};
pub use models::record::{DiagnosticTrace, ReportRecord};
pub use pdf::{PdfExtractor, PdfGeometry, PdfProcessor, PdfType};
pub use report::rules::{PaymentBreakdown, ReportIdentity, format_amount, parse_amount};
pub use report::{
    BoundingBox, GeometryProvider, ReconcileOutcome, Reconciliation, ReportExtractor,
    ReportParser, SubTotals, Tier, TierFailure, Token, TotalsReconciler,
};
