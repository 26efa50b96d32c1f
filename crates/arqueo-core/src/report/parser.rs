//! Report parser composing identity, payment and totals extraction.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::models::config::ArqueoConfig;
use crate::models::record::ReportRecord;
use crate::pdf::{PdfExtractor, PdfGeometry, PdfProcessor, PdfType};

use super::rules::{extract_identity, extract_payments};
use super::spatial::GeometryProvider;
use super::totals::TotalsReconciler;
use super::{ReportExtractor, Result};

/// Batch report parser.
///
/// Holds no per-call state, so one parser can serve many threads.
pub struct ReportParser {
    config: ArqueoConfig,
    geometry: Option<Box<dyn GeometryProvider + Send + Sync>>,
}

impl ReportParser {
    /// Create a parser with default settings and PDF word geometry for the
    /// spatial fallback.
    pub fn new() -> Self {
        Self::with_config(ArqueoConfig::default())
    }

    /// Create a parser from a full configuration.
    pub fn with_config(config: ArqueoConfig) -> Self {
        let geometry = PdfGeometry::from_config(&config.pdf);
        Self {
            config,
            geometry: Some(Box::new(geometry)),
        }
    }

    /// Replace the geometry provider used by the spatial fallback.
    pub fn with_geometry(mut self, geometry: Box<dyn GeometryProvider + Send + Sync>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Remove the geometry provider; the spatial fallback is then skipped.
    pub fn without_geometry(mut self) -> Self {
        self.geometry = None;
        self
    }

    pub fn config(&self) -> &ArqueoConfig {
        &self.config
    }

    /// Parse already-rendered report text.
    pub fn parse(&self, text: &str) -> Result<ReportRecord> {
        self.parse_document(text, None)
    }

    /// Parse report text, offering the source document to the spatial fallback.
    pub fn parse_document(&self, text: &str, document: Option<&[u8]>) -> Result<ReportRecord> {
        let start = Instant::now();
        info!("Parsing report from {} characters of text", text.len());

        let mut reconciler = TotalsReconciler::new(self.config.extraction.clone());
        if let Some(geometry) = self.geometry.as_deref() {
            reconciler = reconciler.with_geometry(geometry);
        }
        let reconciliation = reconciler.reconcile(text, document)?;

        let identity = extract_identity(text);
        if identity.batch_id.is_empty() {
            debug!("Could not extract batch id");
        }
        let payments = extract_payments(text);

        let record = ReportRecord::assemble(text, identity, payments, reconciliation);

        debug!(
            "Extracted batch '{}' ({}) in {} ms",
            record.batch_id,
            record.outcome,
            start.elapsed().as_millis()
        );
        Ok(record)
    }
}

impl Default for ReportParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportExtractor for ReportParser {
    fn extract_from_text(&self, text: &str) -> Result<ReportRecord> {
        self.parse(text)
    }

    fn extract_from_pdf(&self, data: &[u8]) -> crate::Result<ReportRecord> {
        let mut pdf = PdfExtractor::with_config(self.config.pdf.clone());
        pdf.load(data)?;

        let content = pdf.extract_all()?;
        if content.pdf_type == PdfType::Empty {
            warn!(
                "PDF has {} pages but no usable text layer",
                content.page_count
            );
        }

        Ok(self.parse_document(&content.text, Some(pdf.raw_data()))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractionError, PdfError};
    use crate::report::spatial::{BoundingBox, Token};
    use crate::report::totals::{ReconcileOutcome, Tier};
    use pretty_assertions::assert_eq;

    const REPORT: &str = r#"
Listado de Cobranzas por Lote                 Lote C 403279116
Fecha 13-MAR-24          Usuario CMAGALLANES     Cajero CAJA01
Importe Lote 1511592.08

Formas de Pago    Importe    Moneda
EFECTIVO 577119.40 PESOS
TARJETACR 527538.04 PESOS
TARJETADE 406934.64 PESOS

Por 1-Obras Sanitarias: 1478575.98
Por 2-Municipalidad: 33016.10
"#;

    struct Layout;

    impl GeometryProvider for Layout {
        fn page_tokens(&self, _document: &[u8]) -> std::result::Result<Vec<Vec<Token>>, PdfError> {
            Ok(vec![vec![
                Token::new("OSM", BoundingBox::new(0.0, 0.0, 20.0, 10.0)),
                Token::new("1.478.575,98", BoundingBox::new(100.0, 0.0, 160.0, 10.0)),
                Token::new("Muni", BoundingBox::new(0.0, 400.0, 20.0, 410.0)),
                Token::new("33.016,10", BoundingBox::new(100.0, 400.0, 145.0, 410.0)),
            ]])
        }
    }

    #[test]
    fn test_parse_full_report() {
        let record = ReportParser::new().parse(REPORT).unwrap();

        assert_eq!(record.batch_id, "403279116");
        assert_eq!(record.user, "CMAGALLANES");
        assert_eq!(record.cashier, "CAJA01");
        assert_eq!(record.date_string(), "13/03/2024");
        assert_eq!(record.cash.to_string(), "577119.40");
        assert_eq!(record.total_a.to_string(), "1478575.98");
        assert_eq!(record.total_b.to_string(), "33016.10");
        assert_eq!(record.outcome, ReconcileOutcome::Resolved(Tier::PairSum));
        assert_eq!(record.raw_text, REPORT);
        assert!(record.is_complete());
    }

    #[test]
    fn test_parse_empty_text() {
        let result = ReportParser::new().parse("   ");
        assert!(matches!(result, Err(ExtractionError::EmptyInput)));
    }

    #[test]
    fn test_parse_document_with_custom_geometry() {
        let parser = ReportParser::new().with_geometry(Box::new(Layout));
        let record = parser
            .parse_document("Lote C 1\nImporte Lote 1.511.592,08", Some(b"%PDF-1.4"))
            .unwrap();

        assert_eq!(record.outcome, ReconcileOutcome::Resolved(Tier::Spatial));
        assert_eq!(record.total_a.to_string(), "1478575.98");
        assert_eq!(record.total_b.to_string(), "33016.10");
    }

    #[test]
    fn test_without_geometry_skips_spatial() {
        let parser = ReportParser::new().without_geometry();
        let record = parser
            .parse_document("Importe Lote 1511592.08", Some(b"%PDF-1.4"))
            .unwrap();

        assert_eq!(record.outcome, ReconcileOutcome::Unresolved);
        assert!(record
            .diagnostic_trace
            .as_str()
            .contains("skipped: no geometry provider configured"));
    }

    #[test]
    fn test_extract_from_pdf_rejects_garbage() {
        let result = ReportParser::new().extract_from_pdf(b"not a pdf");
        assert!(matches!(result, Err(crate::ArqueoError::Pdf(PdfError::Parse(_)))));
    }
}
