//! Report record: the composed result of one extraction.

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::report::rules::{PaymentBreakdown, ReportIdentity};
use crate::report::totals::{ReconcileOutcome, Reconciliation};

/// Largest tolerated difference between `total_a + total_b` and `grand_total`.
pub const CURRENCY_EPSILON: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Human-readable, append-only log of how the totals were derived.
///
/// Contains no timestamps, so identical input always yields identical text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticTrace(String);

impl DiagnosticTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line.
    pub fn push(&mut self, line: impl AsRef<str>) {
        if !self.0.is_empty() {
            self.0.push('\n');
        }
        self.0.push_str(line.as_ref());
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.lines()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DiagnosticTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured data extracted from one cash-settlement batch report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Full source text, kept for diagnostics only.
    #[serde(skip)]
    pub raw_text: String,

    /// Batch identifier; empty when not found.
    pub batch_id: String,

    /// Settlement date.
    pub date: Option<NaiveDate>,

    pub user: String,
    pub cashier: String,

    pub cash: Decimal,
    pub credit_card: Decimal,
    pub debit_card: Decimal,
    pub deferred_check: Decimal,

    /// Sanitation subtotal.
    pub total_a: Decimal,
    /// Municipal subtotal.
    pub total_b: Decimal,
    pub grand_total: Decimal,

    /// How the subtotals were obtained.
    pub outcome: ReconcileOutcome,

    pub diagnostic_trace: DiagnosticTrace,
}

impl ReportRecord {
    /// Compose a record from the independent extraction results.
    pub fn assemble(
        raw_text: &str,
        identity: ReportIdentity,
        payments: PaymentBreakdown,
        reconciliation: Reconciliation,
    ) -> Self {
        Self {
            raw_text: raw_text.to_string(),
            batch_id: identity.batch_id,
            date: identity.date,
            user: identity.user,
            cashier: identity.cashier,
            cash: payments.cash,
            credit_card: payments.credit_card,
            debit_card: payments.debit_card,
            deferred_check: payments.deferred_check,
            total_a: reconciliation.totals.total_a,
            total_b: reconciliation.totals.total_b,
            grand_total: reconciliation.grand_total,
            outcome: reconciliation.outcome,
            diagnostic_trace: reconciliation.trace,
        }
    }

    pub fn payments(&self) -> PaymentBreakdown {
        PaymentBreakdown {
            cash: self.cash,
            credit_card: self.credit_card,
            debit_card: self.debit_card,
            deferred_check: self.deferred_check,
        }
    }

    /// Credit plus debit card amounts.
    pub fn card_total(&self) -> Decimal {
        self.credit_card.saturating_add(self.debit_card)
    }

    /// Cash the sanitation subtotal implies once card and check payments are removed.
    pub fn expected_cash(&self) -> Decimal {
        self.total_a
            .saturating_sub(self.credit_card)
            .saturating_sub(self.debit_card)
            .saturating_sub(self.deferred_check)
    }

    /// Upper-case Spanish weekday of the settlement date, or empty.
    pub fn day_name(&self) -> &'static str {
        match self.date.map(|d| d.weekday()) {
            Some(Weekday::Mon) => "LUNES",
            Some(Weekday::Tue) => "MARTES",
            Some(Weekday::Wed) => "MIÉRCOLES",
            Some(Weekday::Thu) => "JUEVES",
            Some(Weekday::Fri) => "VIERNES",
            Some(Weekday::Sat) => "SÁBADO",
            Some(Weekday::Sun) => "DOMINGO",
            None => "",
        }
    }

    /// Date as `dd/mm/yyyy`, or empty.
    pub fn date_string(&self) -> String {
        self.date
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_default()
    }

    /// Both subtotals resolved and consistent with the grand total.
    pub fn is_complete(&self) -> bool {
        !self.total_a.is_zero() && !self.total_b.is_zero() && self.totals_consistent()
    }

    fn totals_consistent(&self) -> bool {
        self.total_a
            .checked_add(self.total_b)
            .and_then(|sum| sum.checked_sub(self.grand_total))
            .is_some_and(|delta| delta.abs() < CURRENCY_EPSILON)
    }

    /// Review warnings for a human operator. Empty when nothing looks wrong.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.batch_id.is_empty() {
            issues.push("Missing batch id".to_string());
        }

        if self.date.is_none() {
            issues.push("Missing or unparsable date".to_string());
        }

        if self.user.is_empty() {
            issues.push("Missing user".to_string());
        }

        match self.outcome {
            ReconcileOutcome::AnchorNotFound => {
                issues.push("Grand total anchor not found".to_string());
            }
            ReconcileOutcome::Unresolved => {
                issues.push("Subtotals could not be reconciled".to_string());
            }
            ReconcileOutcome::Resolved(_) => {}
        }

        if !self.total_a.is_zero() && !self.total_b.is_zero() && !self.totals_consistent() {
            issues.push(format!(
                "Subtotals ({} + {}) differ from grand total ({})",
                self.total_a, self.total_b, self.grand_total
            ));
        }

        if self.is_complete() && self.expected_cash() < Decimal::ZERO {
            issues.push(format!(
                "Card and check payments exceed the sanitation subtotal by {}",
                -self.expected_cash()
            ));
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::totals::{SubTotals, Tier};
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sample() -> ReportRecord {
        let mut trace = DiagnosticTrace::new();
        trace.push("grand total: 1511592.08");

        ReportRecord::assemble(
            "raw",
            ReportIdentity {
                batch_id: "403279116".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 3, 13),
                user: "CMAGALLANES".to_string(),
                cashier: "CAJA01".to_string(),
            },
            PaymentBreakdown {
                cash: dec("577119.40"),
                credit_card: dec("527538.04"),
                debit_card: dec("406934.64"),
                deferred_check: Decimal::ZERO,
            },
            Reconciliation {
                totals: SubTotals {
                    total_a: dec("1478575.98"),
                    total_b: dec("33016.10"),
                },
                grand_total: dec("1511592.08"),
                outcome: ReconcileOutcome::Resolved(Tier::PairSum),
                trace,
            },
        )
    }

    #[test]
    fn test_trace_appends_lines() {
        let mut trace = DiagnosticTrace::new();
        assert!(trace.is_empty());
        trace.push("one");
        trace.push(String::from("two"));
        assert_eq!(trace.as_str(), "one\ntwo");
        assert_eq!(trace.lines().count(), 2);
    }

    #[test]
    fn test_derived_amounts() {
        let record = sample();
        assert_eq!(record.card_total(), dec("934472.68"));
        assert_eq!(record.expected_cash(), dec("544103.30"));
        assert_eq!(record.payments().total(), dec("1511592.08"));
    }

    #[test]
    fn test_derived_amounts_saturate() {
        let mut record = sample();
        record.credit_card = Decimal::MAX;
        record.debit_card = Decimal::MAX;
        record.total_a = Decimal::MAX;
        record.total_b = Decimal::MAX;

        assert_eq!(record.card_total(), Decimal::MAX);
        assert_eq!(record.expected_cash(), Decimal::MIN);
        assert_eq!(record.payments().total(), Decimal::MAX);
        assert!(!record.is_complete());
        assert!(!record.validate().is_empty());
    }

    #[test]
    fn test_date_rendering() {
        let mut record = sample();
        assert_eq!(record.day_name(), "MIÉRCOLES");
        assert_eq!(record.date_string(), "13/03/2024");

        record.date = None;
        assert_eq!(record.day_name(), "");
        assert_eq!(record.date_string(), "");
    }

    #[test]
    fn test_complete_record_validates() {
        let record = sample();
        assert!(record.is_complete());
        assert!(record.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_gaps() {
        let mut record = sample();
        record.batch_id.clear();
        record.total_a = Decimal::ZERO;
        record.total_b = Decimal::ZERO;
        record.outcome = ReconcileOutcome::Unresolved;

        let issues = record.validate();
        assert!(!record.is_complete());
        assert_eq!(
            issues,
            vec![
                "Missing batch id".to_string(),
                "Subtotals could not be reconciled".to_string(),
            ]
        );
    }

    #[test]
    fn test_serialization_skips_raw_text() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("raw_text").is_none());
        assert_eq!(json["batch_id"], "403279116");
        assert_eq!(json["date"], "2024-03-13");
        assert_eq!(json["outcome"]["status"], "resolved");
        assert_eq!(json["outcome"]["tier"], "pair_sum");
        assert_eq!(json["diagnostic_trace"], "grand total: 1511592.08");
    }
}
