//! Configuration structures for the extraction pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main configuration for the arqueo pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArqueoConfig {
    /// Field extraction and reconciliation configuration.
    pub extraction: ExtractionConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Output configuration for embedding applications.
    pub output: OutputConfig,
}

/// Totals reconciliation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Largest difference tolerated between the subtotal sum and the grand total.
    pub currency_epsilon: Decimal,

    /// Subtotal candidates at or below this amount are treated as noise.
    pub candidate_floor: Decimal,

    /// Fall back to word geometry when the text layer does not reconcile.
    pub spatial_fallback: bool,

    /// Maximum anchor-to-amount distance for the geometry fallback, in page units.
    pub spatial_radius: f64,

    /// Amounts found by geometry must be strictly greater than this.
    pub spatial_min_amount: Decimal,

    /// Largest difference tolerated between the geometry result and the grand total.
    pub spatial_tolerance: Decimal,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            currency_epsilon: Decimal::new(10, 2),
            candidate_floor: Decimal::new(1000, 0),
            spatial_fallback: true,
            spatial_radius: 300.0,
            spatial_min_amount: Decimal::new(1000, 0),
            spatial_tolerance: Decimal::new(1000, 0),
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Minimum text length to consider the PDF text-based.
    pub min_text_length: usize,

    /// Try an empty password on encrypted documents.
    pub decrypt_empty_password: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            min_text_length: 50,
            decrypt_empty_password: true,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format name (json, csv, xml, text).
    pub default_format: String,

    /// Include the diagnostic trace in rendered output.
    pub include_trace: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "json".to_string(),
            include_trace: true,
        }
    }
}

impl ArqueoConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
