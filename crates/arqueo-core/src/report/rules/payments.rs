//! Payment-method breakdown from the payment summary section.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::amounts::parse_amount;
use super::patterns::PAYMENT_SECTION;
use super::{FieldExtractor, LabelRule, ValuePattern, tokenize};

pub const CASH: LabelRule = LabelRule::new("cash", &["EFECTIVO"], ValuePattern::Amount);
pub const CREDIT_CARD: LabelRule =
    LabelRule::new("credit_card", &["TARJETACR"], ValuePattern::Amount);
pub const DEBIT_CARD: LabelRule =
    LabelRule::new("debit_card", &["TARJETADE"], ValuePattern::Amount);
pub const DEFERRED_CHECK: LabelRule =
    LabelRule::new("deferred_check", &["CHEQUEDIF"], ValuePattern::Amount);

/// Amounts collected per payment method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentBreakdown {
    pub cash: Decimal,
    pub credit_card: Decimal,
    pub debit_card: Decimal,
    pub deferred_check: Decimal,
}

impl PaymentBreakdown {
    /// Sum of all payment methods.
    pub fn total(&self) -> Decimal {
        self.cash
            .saturating_add(self.credit_card)
            .saturating_add(self.debit_card)
            .saturating_add(self.deferred_check)
    }
}

/// Payment breakdown extractor.
pub struct PaymentExtractor;

impl PaymentExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PaymentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for PaymentExtractor {
    type Output = PaymentBreakdown;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        payment_section(text).map(extract_from_section)
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.extract(text).into_iter().collect()
    }
}

/// Extract the payment breakdown. A missing section yields all zeros.
pub fn extract_payments(text: &str) -> PaymentBreakdown {
    PaymentExtractor::new().extract(text).unwrap_or_default()
}

/// Locate the payment summary body, without its header line.
pub fn payment_section(text: &str) -> Option<&str> {
    PAYMENT_SECTION
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn extract_from_section(section: &str) -> PaymentBreakdown {
    let lexemes = tokenize(section);
    let amount = |rule: &LabelRule| {
        let value = rule
            .matches(section, &lexemes)
            .into_iter()
            .next()
            .map(|m| parse_amount(&m.value))
            .unwrap_or(Decimal::ZERO);
        trace!("payment rule {} -> {}", rule.name, value);
        value
    };

    PaymentBreakdown {
        cash: amount(&CASH),
        credit_card: amount(&CREDIT_CARD),
        debit_card: amount(&DEBIT_CARD),
        deferred_check: amount(&DEFERRED_CHECK),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_extract_payments() {
        let text = r#"
Formas de Pago    Importe    Moneda
EFECTIVO 577119.40 PESOS
TARJETACR 527538.04 PESOS
TARJETADE 406934.64 PESOS

Por 1-Obras Sanitarias: 1478575.98
"#;

        assert_eq!(
            extract_payments(text),
            PaymentBreakdown {
                cash: dec("577119.40"),
                credit_card: dec("527538.04"),
                debit_card: dec("406934.64"),
                deferred_check: Decimal::ZERO,
            }
        );
    }

    #[test]
    fn test_section_stops_at_municipal_section() {
        let text = "Formas de Pago Importe Moneda\nCHEQUEDIF 2.612.475,91\nPor 2-Municipalidad\nEFECTIVO 99.00";
        let payments = extract_payments(text);

        assert_eq!(payments.deferred_check, dec("2612475.91"));
        assert_eq!(payments.cash, Decimal::ZERO);
    }

    #[test]
    fn test_labels_outside_section_ignored() {
        let text = "EFECTIVO 100.00\nTARJETACR 50.00";
        assert_eq!(extract_payments(text), PaymentBreakdown::default());
        assert!(PaymentExtractor::new().extract(text).is_none());
    }

    #[test]
    fn test_breakdown_total() {
        let payments = PaymentBreakdown {
            cash: dec("10.50"),
            credit_card: dec("20"),
            debit_card: dec("0.25"),
            deferred_check: dec("1"),
        };
        assert_eq!(payments.total(), dec("31.75"));
    }
}
