//! Rule-based field extractors for batch settlement reports.
//!
//! Each field is described by a [`LabelRule`]: a fixed sequence of label words
//! followed by a value of a known shape. Rules run over the lexemes produced
//! by [`lexer::tokenize`], so line breaks and repeated spaces between the
//! label and its value do not matter.

pub mod amounts;
pub mod identity;
pub mod lexer;
pub mod patterns;
pub mod payments;

pub use amounts::{format_amount, parse_amount};
pub use identity::{IdentityExtractor, ReportIdentity, extract_identity, parse_short_date};
pub use lexer::{Lexeme, tokenize};
pub use payments::{PaymentBreakdown, PaymentExtractor, extract_payments};

use patterns::SHORT_DATE;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A matched value together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Byte span of the value in the source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched, label included.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, source: impl Into<String>) -> Self {
        Self {
            value,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}

/// Shape of the value that must follow a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuePattern {
    /// A run of ASCII digits.
    Digits,
    /// A run of upper-case ASCII letters and digits.
    UpperAlnum,
    /// A currency-like number: digits with `.` and `,` separators.
    Amount,
    /// A `DD-MMM-YY` date.
    ShortDate,
}

impl ValuePattern {
    /// Capture the leading part of `word` that has this shape.
    pub fn capture<'a>(&self, word: &'a str) -> Option<&'a str> {
        match self {
            ValuePattern::Digits => leading(word, |c| c.is_ascii_digit()),
            ValuePattern::UpperAlnum => {
                leading(word, |c| c.is_ascii_uppercase() || c.is_ascii_digit())
            }
            ValuePattern::Amount => {
                if !word.starts_with(|c: char| c.is_ascii_digit()) {
                    return None;
                }
                leading(word, |c| c.is_ascii_digit() || c == '.' || c == ',')
                    .map(|s| s.trim_end_matches(['.', ',']))
            }
            ValuePattern::ShortDate => SHORT_DATE.find(word).map(|m| m.as_str()),
        }
    }
}

fn leading(word: &str, accept: impl Fn(char) -> bool) -> Option<&str> {
    let end = word
        .char_indices()
        .find(|(_, c)| !accept(*c))
        .map(|(i, _)| i)
        .unwrap_or(word.len());

    if end == 0 { None } else { Some(&word[..end]) }
}

/// A named extraction rule: label words followed by a value.
#[derive(Debug, Clone, Copy)]
pub struct LabelRule {
    /// Rule name, used in diagnostics.
    pub name: &'static str,
    /// Label words, matched exactly and in order.
    pub label: &'static [&'static str],
    /// Shape of the value following the label.
    pub value: ValuePattern,
}

impl LabelRule {
    pub const fn new(
        name: &'static str,
        label: &'static [&'static str],
        value: ValuePattern,
    ) -> Self {
        Self { name, label, value }
    }

    /// Apply the rule to pre-tokenized text.
    pub fn matches(&self, text: &str, lexemes: &[Lexeme<'_>]) -> Vec<ExtractionMatch<String>> {
        let n = self.label.len();
        let mut results = Vec::new();

        if n == 0 || lexemes.len() <= n {
            return results;
        }

        for i in 0..lexemes.len() - n {
            let window = &lexemes[i..i + n];
            if !window.iter().zip(self.label).all(|(lex, word)| lex.text == *word) {
                continue;
            }

            let candidate = lexemes[i + n];
            if let Some(value) = self.value.capture(candidate.text) {
                let end = candidate.start + value.len();
                results.push(
                    ExtractionMatch::new(value.to_string(), &text[lexemes[i].start..end])
                        .with_position(candidate.start, end),
                );
            }
        }

        results
    }
}

impl FieldExtractor for LabelRule {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.matches(text, &tokenize(text))
    }
}
