//! Data models for batch reports and pipeline configuration.

pub mod config;
pub mod record;

pub use config::{ArqueoConfig, ExtractionConfig, OutputConfig, PdfConfig};
pub use record::{CURRENCY_EPSILON, DiagnosticTrace, ReportRecord};
