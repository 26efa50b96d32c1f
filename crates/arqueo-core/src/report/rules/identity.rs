//! Batch identity extraction: batch id, date, user and cashier.

use chrono::NaiveDate;

use super::{FieldExtractor, LabelRule, ValuePattern, tokenize};

pub const BATCH_ID: LabelRule = LabelRule::new("batch_id", &["Lote", "C"], ValuePattern::Digits);
pub const DATE: LabelRule = LabelRule::new("date", &["Fecha"], ValuePattern::ShortDate);
pub const USER: LabelRule = LabelRule::new("user", &["Usuario"], ValuePattern::UpperAlnum);
pub const CASHIER: LabelRule = LabelRule::new("cashier", &["Cajero"], ValuePattern::UpperAlnum);

/// Month abbreviations used by the reporting engine.
const MONTHS: [(&str, u32); 12] = [
    ("ENE", 1),
    ("FEB", 2),
    ("MAR", 3),
    ("ABR", 4),
    ("MAY", 5),
    ("JUN", 6),
    ("JUL", 7),
    ("AGO", 8),
    ("SEP", 9),
    ("OCT", 10),
    ("NOV", 11),
    ("DIC", 12),
];

/// Identity fields of a batch report. Missing fields stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportIdentity {
    pub batch_id: String,
    pub date: Option<NaiveDate>,
    pub user: String,
    pub cashier: String,
}

/// Identity field extractor.
pub struct IdentityExtractor;

impl IdentityExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IdentityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for IdentityExtractor {
    type Output = ReportIdentity;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        let identity = extract_identity(text);
        if identity == ReportIdentity::default() {
            None
        } else {
            Some(identity)
        }
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.extract(text).into_iter().collect()
    }
}

/// Extract the identity fields from report text. Never fails.
pub fn extract_identity(text: &str) -> ReportIdentity {
    let lexemes = tokenize(text);
    let first = |rule: &LabelRule| rule.matches(text, &lexemes).into_iter().next().map(|m| m.value);

    ReportIdentity {
        batch_id: first(&BATCH_ID).unwrap_or_default(),
        date: first(&DATE).and_then(|d| parse_short_date(&d)),
        user: first(&USER).unwrap_or_default(),
        cashier: first(&CASHIER).unwrap_or_default(),
    }
}

/// Parse a `DD-MMM-YY` date with a Spanish month abbreviation.
///
/// Two-digit years are read as `2000 + YY`. An unknown month or an impossible
/// day yields `None`.
pub fn parse_short_date(s: &str) -> Option<NaiveDate> {
    let mut parts = s.trim().split('-');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let day: u32 = day.parse().ok()?;
    let year: i32 = year.parse().ok()?;
    let month = month_number(month)?;

    NaiveDate::from_ymd_opt(2000 + year, month, day)
}

fn month_number(abbrev: &str) -> Option<u32> {
    let upper = abbrev.to_ascii_uppercase();
    MONTHS.iter().find(|(name, _)| *name == upper).map(|(_, n)| *n)
}
