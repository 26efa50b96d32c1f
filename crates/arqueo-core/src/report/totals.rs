//! Totals reconciliation.
//!
//! A batch report prints one grand total (`Importe Lote`) and, somewhere in
//! its body, the two subtotals that make it up. The layout varies between
//! reports, so the subtotals are searched with ordered strategies ("tiers")
//! of decreasing certainty. The first tier producing two positive amounts
//! that add up to the grand total wins. Every attempt is written to the
//! diagnostic trace, whether it succeeds or not.

use std::fmt;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::rules::amounts::parse_amount;
use super::rules::patterns::{
    GRAND_TOTAL, MUNICIPAL_ROW_TOTAL, MUNICIPAL_SUMMARY_TOTAL, SANITATION_TOTAL,
    SECTION_AMOUNT_LABEL, TOTAL_AMOUNT_LABEL,
};
use super::spatial::{GeometryProvider, Section, SpatialLocator};
use crate::error::ExtractionError;
use crate::models::config::ExtractionConfig;
use crate::models::record::DiagnosticTrace;

/// One reconciliation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Subtotals read after their section anchors.
    Anchored,
    /// Two generic total candidates that sum to the grand total.
    PairSum,
    /// A single candidate and its complement to the grand total.
    Complement,
    /// Amounts nearest to the section names on the page.
    Spatial,
}

impl Tier {
    pub fn number(&self) -> u8 {
        match self {
            Tier::Anchored => 1,
            Tier::PairSum => 2,
            Tier::Complement => 3,
            Tier::Spatial => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tier::Anchored => "anchored",
            Tier::PairSum => "pair-sum",
            Tier::Complement => "complement",
            Tier::Spatial => "spatial",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {} ({})", self.number(), self.name())
    }
}

/// Why a tier did not produce subtotals.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TierFailure {
    #[error("missing subtotal (sanitation {sanitation:.2}, municipal {municipal:.2})")]
    MissingSubtotal { sanitation: Decimal, municipal: Decimal },

    #[error("subtotals sum to {sum:.2}, expected {expected:.2} (delta {delta:.2})")]
    SumMismatch { sum: Decimal, expected: Decimal, delta: Decimal },

    #[error("no pair among {count} candidates sums to the grand total")]
    NoMatchingPair { count: usize },

    #[error("needs exactly one candidate, found {0}")]
    CandidateCount(usize),

    #[error("complement {0:.2} is not positive")]
    NonPositiveComplement(Decimal),

    #[error("disabled by configuration")]
    Disabled,

    #[error("no document bytes supplied")]
    NoDocument,

    #[error("no geometry provider configured")]
    NoGeometryProvider,

    #[error("geometry unavailable: {0}")]
    Geometry(String),

    #[error("sum {sum:.2} differs from grand total {expected:.2} by {delta:.2}")]
    Inconsistent { sum: Decimal, expected: Decimal, delta: Decimal },

    #[error("subtotals {0:.2} and {1:.2} overflow when added")]
    Overflow(Decimal, Decimal),
}

impl TierFailure {
    /// The tier was never attempted, as opposed to attempted and failed.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            TierFailure::Disabled | TierFailure::NoDocument | TierFailure::NoGeometryProvider
        )
    }
}

/// The two reconciled subtotals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTotals {
    /// Sanitation subtotal.
    pub total_a: Decimal,
    /// Municipal subtotal.
    pub total_b: Decimal,
}

impl SubTotals {
    /// Larger value to `total_a`, smaller to `total_b`.
    pub fn by_magnitude(x: Decimal, y: Decimal) -> Self {
        Self {
            total_a: x.max(y),
            total_b: x.min(y),
        }
    }

    /// `total_a + total_b`, or `None` past the decimal range.
    pub fn checked_sum(&self) -> Option<Decimal> {
        self.total_a.checked_add(self.total_b)
    }

    pub fn is_zero(&self) -> bool {
        self.total_a.is_zero() && self.total_b.is_zero()
    }
}

/// Final state of a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "tier", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// A tier produced matching subtotals.
    Resolved(Tier),
    /// The grand-total anchor is missing; nothing was attempted.
    AnchorNotFound,
    /// Every tier failed; subtotals are zero.
    Unresolved,
}

impl ReconcileOutcome {
    pub fn tier(&self) -> Option<Tier> {
        match self {
            ReconcileOutcome::Resolved(tier) => Some(*tier),
            _ => None,
        }
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::Resolved(tier) => write!(f, "resolved by {}", tier),
            ReconcileOutcome::AnchorNotFound => f.write_str("grand total anchor not found"),
            ReconcileOutcome::Unresolved => f.write_str("unresolved"),
        }
    }
}

/// Result of [`TotalsReconciler::reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub totals: SubTotals,
    pub grand_total: Decimal,
    pub outcome: ReconcileOutcome,
    pub trace: DiagnosticTrace,
}

/// Shared inputs of the text tiers.
pub struct TierContext<'a> {
    pub text: &'a str,
    pub grand_total: Decimal,
    /// Generic total amounts, deduplicated, above the floor, excluding the grand total.
    pub candidates: Vec<Decimal>,
    pub config: &'a ExtractionConfig,
}

impl<'a> TierContext<'a> {
    pub fn new(text: &'a str, grand_total: Decimal, config: &'a ExtractionConfig) -> Self {
        let candidates = subtotal_candidates(text, grand_total, config.candidate_floor);
        Self {
            text,
            grand_total,
            candidates,
            config,
        }
    }

    fn matches_grand_total(&self, sum: Decimal) -> bool {
        sum.saturating_sub(self.grand_total).abs() < self.config.currency_epsilon
    }
}

type TextTier = fn(&TierContext<'_>, &mut DiagnosticTrace) -> Result<SubTotals, TierFailure>;

const TEXT_TIERS: [(Tier, TextTier); 3] = [
    (Tier::Anchored, anchored_tier as TextTier),
    (Tier::PairSum, pair_sum_tier as TextTier),
    (Tier::Complement, complement_tier as TextTier),
];

/// Multi-tier totals reconciler.
pub struct TotalsReconciler<'g> {
    config: ExtractionConfig,
    geometry: Option<&'g dyn GeometryProvider>,
}

impl<'g> TotalsReconciler<'g> {
    /// Create a reconciler without a geometry provider; tier 4 is skipped.
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            geometry: None,
        }
    }

    /// Attach the geometry provider used by tier 4.
    pub fn with_geometry(mut self, geometry: &'g dyn GeometryProvider) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Reconcile the subtotals of a report.
    ///
    /// `document` is the raw source document; it is only read when the text
    /// tiers fail and the spatial fallback runs. Empty text is the only error.
    pub fn reconcile(
        &self,
        text: &str,
        document: Option<&[u8]>,
    ) -> Result<Reconciliation, ExtractionError> {
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyInput);
        }

        let mut trace = DiagnosticTrace::new();

        let Some(grand_total) = grand_total(text) else {
            warn!("grand total anchor not found");
            trace.push("grand total anchor 'Importe Lote' not found; totals left at zero");
            return Ok(Reconciliation {
                totals: SubTotals::default(),
                grand_total: Decimal::ZERO,
                outcome: ReconcileOutcome::AnchorNotFound,
                trace,
            });
        };
        trace.push(format!("grand total: {:.2}", grand_total));

        let ctx = TierContext::new(text, grand_total, &self.config);
        for (tier, run) in TEXT_TIERS {
            match run(&ctx, &mut trace) {
                Ok(totals) => return Ok(resolved(tier, totals, grand_total, trace)),
                Err(failure) => record_failure(&mut trace, tier, &failure),
            }
        }

        match self.spatial_tier(document, grand_total, &mut trace) {
            Ok((totals, sum)) => {
                if sum != grand_total {
                    trace.push(format!(
                        "{}: grand total {:.2} replaced by subtotal sum {:.2}",
                        Tier::Spatial,
                        grand_total,
                        sum
                    ));
                }
                return Ok(resolved(Tier::Spatial, totals, sum, trace));
            }
            Err(failure) => record_failure(&mut trace, Tier::Spatial, &failure),
        }

        debug!("no tier reconciled the subtotals");
        trace.push("no tier reconciled the subtotals; totals left at zero (extraction incomplete)");
        Ok(Reconciliation {
            totals: SubTotals::default(),
            grand_total,
            outcome: ReconcileOutcome::Unresolved,
            trace,
        })
    }

    fn spatial_tier(
        &self,
        document: Option<&[u8]>,
        grand_total: Decimal,
        trace: &mut DiagnosticTrace,
    ) -> Result<(SubTotals, Decimal), TierFailure> {
        if !self.config.spatial_fallback {
            return Err(TierFailure::Disabled);
        }
        let document = document.ok_or(TierFailure::NoDocument)?;
        let geometry = self.geometry.ok_or(TierFailure::NoGeometryProvider)?;

        let pages = geometry
            .page_tokens(document)
            .map_err(|e| TierFailure::Geometry(e.to_string()))?;

        let locator =
            SpatialLocator::new(self.config.spatial_radius, self.config.spatial_min_amount);
        let sanitation = locator.locate(&pages, Section::Sanitation);
        let municipal = locator.locate(&pages, Section::Municipal);
        trace.push(format!(
            "{}: sanitation={:.2} municipal={:.2} ({} pages)",
            Tier::Spatial,
            sanitation,
            municipal,
            pages.len()
        ));

        if sanitation <= Decimal::ZERO || municipal <= Decimal::ZERO {
            return Err(TierFailure::MissingSubtotal { sanitation, municipal });
        }

        let totals = SubTotals {
            total_a: sanitation,
            total_b: municipal,
        };
        let sum = totals
            .checked_sum()
            .ok_or(TierFailure::Overflow(sanitation, municipal))?;
        let delta = sum.saturating_sub(grand_total).abs();
        if delta >= self.config.spatial_tolerance {
            return Err(TierFailure::Inconsistent {
                sum,
                expected: grand_total,
                delta,
            });
        }

        Ok((totals, sum))
    }
}

fn resolved(
    tier: Tier,
    totals: SubTotals,
    grand_total: Decimal,
    mut trace: DiagnosticTrace,
) -> Reconciliation {
    debug!("subtotals resolved by {}", tier);
    trace.push(format!(
        "{}: resolved total_a={:.2} total_b={:.2}",
        tier, totals.total_a, totals.total_b
    ));
    Reconciliation {
        totals,
        grand_total,
        outcome: ReconcileOutcome::Resolved(tier),
        trace,
    }
}

fn record_failure(trace: &mut DiagnosticTrace, tier: Tier, failure: &TierFailure) {
    let verb = if failure.is_skip() { "skipped" } else { "failed" };
    trace.push(format!("{}: {}: {}", tier, verb, failure));
}

/// Amount printed after the grand-total anchor, if the anchor exists.
pub fn grand_total(text: &str) -> Option<Decimal> {
    capture_amount(&GRAND_TOTAL, text)
}

fn capture_amount(re: &Regex, text: &str) -> Option<Decimal> {
    re.captures(text).map(|caps| parse_amount(&caps[1]))
}

/// Amounts following the generic total labels, in label order then text
/// order, deduplicated, above `floor` and different from the grand total.
pub fn subtotal_candidates(text: &str, grand_total: Decimal, floor: Decimal) -> Vec<Decimal> {
    let mut candidates: Vec<Decimal> = Vec::new();

    let found = TOTAL_AMOUNT_LABEL
        .captures_iter(text)
        .chain(SECTION_AMOUNT_LABEL.captures_iter(text))
        .map(|caps| parse_amount(&caps[1]));

    for amount in found {
        if amount > floor && amount != grand_total && !candidates.contains(&amount) {
            candidates.push(amount);
        }
    }

    candidates
}

fn anchored_tier(
    ctx: &TierContext<'_>,
    trace: &mut DiagnosticTrace,
) -> Result<SubTotals, TierFailure> {
    let sanitation = capture_amount(&SANITATION_TOTAL, ctx.text).unwrap_or(Decimal::ZERO);
    let municipal = capture_amount(&MUNICIPAL_ROW_TOTAL, ctx.text)
        .or_else(|| capture_amount(&MUNICIPAL_SUMMARY_TOTAL, ctx.text))
        .unwrap_or(Decimal::ZERO);

    trace.push(format!(
        "{}: sanitation={:.2} municipal={:.2}",
        Tier::Anchored,
        sanitation,
        municipal
    ));

    if sanitation <= Decimal::ZERO || municipal <= Decimal::ZERO {
        return Err(TierFailure::MissingSubtotal { sanitation, municipal });
    }

    let totals = SubTotals {
        total_a: sanitation,
        total_b: municipal,
    };
    let sum = totals
        .checked_sum()
        .ok_or(TierFailure::Overflow(sanitation, municipal))?;
    if !ctx.matches_grand_total(sum) {
        return Err(TierFailure::SumMismatch {
            sum,
            expected: ctx.grand_total,
            delta: sum.saturating_sub(ctx.grand_total).abs(),
        });
    }

    Ok(totals)
}

fn pair_sum_tier(
    ctx: &TierContext<'_>,
    trace: &mut DiagnosticTrace,
) -> Result<SubTotals, TierFailure> {
    let listed: Vec<String> = ctx.candidates.iter().map(|c| format!("{:.2}", c)).collect();
    trace.push(format!(
        "{}: {} candidates above {:.2}: [{}]",
        Tier::PairSum,
        ctx.candidates.len(),
        ctx.config.candidate_floor,
        listed.join(", ")
    ));

    for (i, &first) in ctx.candidates.iter().enumerate() {
        for &second in &ctx.candidates[i + 1..] {
            let matched = first
                .checked_add(second)
                .is_some_and(|sum| ctx.matches_grand_total(sum));
            if matched {
                return Ok(SubTotals::by_magnitude(first, second));
            }
        }
    }

    Err(TierFailure::NoMatchingPair {
        count: ctx.candidates.len(),
    })
}

fn complement_tier(
    ctx: &TierContext<'_>,
    trace: &mut DiagnosticTrace,
) -> Result<SubTotals, TierFailure> {
    let [found] = ctx.candidates.as_slice() else {
        return Err(TierFailure::CandidateCount(ctx.candidates.len()));
    };

    let complement = ctx.grand_total.saturating_sub(*found);
    if complement <= Decimal::ZERO {
        return Err(TierFailure::NonPositiveComplement(complement));
    }

    trace.push(format!(
        "{}: {:.2} + {:.2} = {:.2}",
        Tier::Complement,
        found,
        complement,
        ctx.grand_total
    ));
    Ok(SubTotals::by_magnitude(*found, complement))
}
