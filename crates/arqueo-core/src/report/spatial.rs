//! Geometry-proximity amount lookup.
//!
//! Used only as the last reconciliation tier: when the text layer does not
//! yield both subtotals, the amounts printed closest to the section names on
//! the page are taken instead.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::rules::amounts::parse_amount;
use super::rules::patterns::STRICT_AMOUNT;
use crate::error::PdfError;

/// Axis-aligned bounding box in page units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl BoundingBox {
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self { left, right, top, bottom }
    }

    /// Center point of the box.
    pub fn center(&self) -> (f64, f64) {
        ((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    /// Euclidean distance between the centers of two boxes.
    pub fn distance_to(&self, other: &BoundingBox) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt()
    }
}

/// A word with its position on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub bbox: BoundingBox,
}

impl Token {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self { text: text.into(), bbox }
    }
}

/// Source of per-page word geometry for a raw document.
pub trait GeometryProvider {
    /// Tokens of each page, in page order.
    fn page_tokens(&self, document: &[u8]) -> Result<Vec<Vec<Token>>, PdfError>;
}

/// Report section whose subtotal is looked up spatially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Sanitation works receipts (reconciles into `total_a`).
    Sanitation,
    /// Municipal receipts (reconciles into `total_b`).
    Municipal,
}

impl Section {
    /// Anchor labels, matched as case-insensitive substrings.
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            Section::Sanitation => &["Obras", "Sanitarias", "OSM"],
            Section::Municipal => &["Municipalidad", "Municipal", "Muni"],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Section::Sanitation => "sanitation",
            Section::Municipal => "municipal",
        }
    }
}

/// Closest qualifying amount found near an anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialHit {
    pub value: Decimal,
    pub distance: f64,
    /// Zero-based page index.
    pub page: usize,
}

/// Nearest-amount locator.
#[derive(Debug, Clone)]
pub struct SpatialLocator {
    /// Maximum center-to-center distance between anchor and amount.
    radius: f64,
    /// Amounts must be strictly greater than this.
    min_amount: Decimal,
}

impl SpatialLocator {
    pub fn new(radius: f64, min_amount: Decimal) -> Self {
        Self { radius, min_amount }
    }

    /// Value of the closest qualifying amount to any anchor of `section`
    /// across all pages, or zero when nothing lies within the radius.
    pub fn locate(&self, pages: &[Vec<Token>], section: Section) -> Decimal {
        self.locate_hit(pages, section)
            .map(|hit| hit.value)
            .unwrap_or(Decimal::ZERO)
    }

    /// Like [`locate`](Self::locate), keeping distance and page.
    pub fn locate_hit(&self, pages: &[Vec<Token>], section: Section) -> Option<SpatialHit> {
        let mut best: Option<SpatialHit> = None;

        for (page, tokens) in pages.iter().enumerate() {
            if let Some((value, distance)) = self.nearest_on_page(tokens, section.labels()) {
                trace!(
                    "{} candidate {} at {:.1} on page {}",
                    section.name(),
                    value,
                    distance,
                    page + 1
                );
                if best.is_none_or(|b| distance < b.distance) {
                    best = Some(SpatialHit { value, distance, page });
                }
            }
        }

        best
    }

    /// Closest amount to any anchor token on one page.
    pub fn nearest_on_page(&self, tokens: &[Token], labels: &[&str]) -> Option<(Decimal, f64)> {
        let labels: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();
        let anchors: Vec<&Token> = tokens
            .iter()
            .filter(|t| {
                let text = t.text.to_lowercase();
                labels.iter().any(|l| text.contains(l.as_str()))
            })
            .collect();

        if anchors.is_empty() {
            return None;
        }

        let amounts: Vec<(&Token, Decimal)> = tokens
            .iter()
            .filter(|t| STRICT_AMOUNT.is_match(t.text.trim()))
            .map(|t| (t, parse_amount(&t.text)))
            .filter(|(_, value)| *value > self.min_amount)
            .collect();

        let mut best: Option<(Decimal, f64)> = None;
        for anchor in &anchors {
            for (token, value) in &amounts {
                let d = anchor.bbox.distance_to(&token.bbox);
                if d <= self.radius && best.is_none_or(|(_, bd)| d < bd) {
                    best = Some((*value, d));
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn token(text: &str, x: f64, y: f64) -> Token {
        Token::new(text, BoundingBox::new(x, y, x + 40.0, y + 10.0))
    }

    fn locator() -> SpatialLocator {
        SpatialLocator::new(300.0, dec("1000"))
    }

    #[test]
    fn test_nearest_amount_wins() {
        let page = vec![
            token("Municipalidad", 100.0, 500.0),
            token("33016.10", 200.0, 500.0),
            token("99999.99", 350.0, 500.0),
        ];

        assert_eq!(locator().locate(&[page], Section::Municipal), dec("33016.10"));
    }

    #[test]
    fn test_radius_and_floor() {
        let page = vec![
            token("OBRAS", 0.0, 0.0),
            // within radius but not above the floor
            token("999.00", 10.0, 0.0),
            // above the floor but too far
            token("1478575.98", 400.0, 0.0),
        ];

        assert_eq!(locator().locate(&[page], Section::Sanitation), Decimal::ZERO);
    }

    #[test]
    fn test_non_strict_numbers_ignored() {
        let page = vec![
            token("Sanitarias", 0.0, 0.0),
            token("403279116", 5.0, 0.0),
            token("1,478,575.98", 100.0, 0.0),
        ];

        assert_eq!(locator().locate(&[page], Section::Sanitation), dec("1478575.98"));
    }

    #[test]
    fn test_closest_across_pages() {
        let first = vec![token("Muni", 0.0, 0.0), token("5000.00", 250.0, 0.0)];
        let second = vec![token("Municipal", 0.0, 0.0), token("33016.10", 50.0, 0.0)];

        let hit = locator().locate_hit(&[first, second], Section::Municipal).unwrap();
        assert_eq!(hit.value, dec("33016.10"));
        assert_eq!(hit.page, 1);
    }

    #[test]
    fn test_no_anchor_or_no_pages() {
        let page = vec![token("33016.10", 0.0, 0.0)];
        assert_eq!(locator().locate(&[page], Section::Municipal), Decimal::ZERO);
        assert_eq!(locator().locate(&[], Section::Municipal), Decimal::ZERO);
    }

    #[test]
    fn test_bbox_distance() {
        let a = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        let b = BoundingBox::new(3.0, 4.0, 5.0, 6.0);
        assert_eq!(a.center(), (1.0, 1.0));
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-9);
    }
}
