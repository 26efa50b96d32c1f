//! Currency amount parsing and formatting.
//!
//! Reports mix `1.234.567,89` and `1,234,567.89` in the same document, so the
//! decimal separator is decided per string, never from a locale.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Separator layout detected in a raw amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separators {
    /// No separator at all.
    None,
    /// Only periods: the period is the decimal separator.
    PeriodOnly,
    /// Only commas, with the text after the last comma.
    CommaOnly { fraction_len: usize },
    /// Both separators; the one occurring last is the decimal separator.
    Both { decimal: char },
}

impl Separators {
    fn detect(s: &str) -> Self {
        let comma = s.rfind(',');
        let period = s.rfind('.');

        match (comma, period) {
            (None, None) => Separators::None,
            (None, Some(_)) => Separators::PeriodOnly,
            (Some(c), None) => Separators::CommaOnly {
                fraction_len: s[c + 1..].chars().count(),
            },
            (Some(c), Some(p)) => Separators::Both {
                decimal: if c > p { ',' } else { '.' },
            },
        }
    }
}

/// Parse a locale-ambiguous amount into an exact decimal.
///
/// Never fails: anything that cannot be read as a number yields zero.
///
/// - both `,` and `.` present: the later one is the decimal separator and the
///   other is stripped as a thousands separator;
/// - only `,`: a decimal separator when exactly two characters follow the last
///   comma, otherwise a thousands separator;
/// - only `.`: parsed as a plain decimal.
pub fn parse_amount(raw: &str) -> Decimal {
    let cleaned: String = raw.trim().chars().filter(|c| !c.is_whitespace()).collect();

    let normalized = match Separators::detect(&cleaned) {
        Separators::None | Separators::PeriodOnly => cleaned,
        Separators::CommaOnly { fraction_len: 2 } => match cleaned.rsplit_once(',') {
            Some((int_part, frac)) => format!("{}.{}", int_part.replace(',', ""), frac),
            None => cleaned,
        },
        Separators::CommaOnly { .. } => cleaned.replace(',', ""),
        Separators::Both { decimal: ',' } => cleaned.replace('.', "").replace(',', "."),
        Separators::Both { .. } => cleaned.replace(',', ""),
    };

    Decimal::from_str(&normalized).unwrap_or(Decimal::ZERO)
}

/// Format an amount in Argentine currency style (`$ 1.234.567,89`).
///
/// Zero renders as an empty string, matching how review sheets leave unused
/// payment columns blank.
pub fn format_amount(amount: Decimal) -> String {
    if amount.is_zero() {
        return String::new();
    }

    let s = format!("{:.2}", amount.abs());
    let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let chars: Vec<char> = integer_part.chars().collect();
    let mut grouped = String::new();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    let sign = if amount.is_sign_negative() { "-" } else { "" };
    format!("{}$ {},{}", sign, grouped, decimal_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_mixed_separators() {
        assert_eq!(parse_amount("1.234.567,89"), dec("1234567.89"));
        assert_eq!(parse_amount("1,234,567.89"), dec("1234567.89"));
        assert_eq!(parse_amount("1.234.567,89"), parse_amount("1,234,567.89"));
    }

    #[test]
    fn test_parse_comma_only() {
        assert_eq!(parse_amount("12,50"), dec("12.50"));
        assert_eq!(parse_amount("20,000"), dec("20000"));
        assert_eq!(parse_amount("1,234,56"), dec("1234.56"));
        assert_eq!(parse_amount("1,5"), dec("15"));
    }

    #[test]
    fn test_parse_period_only() {
        assert_eq!(parse_amount("577119.40"), dec("577119.40"));
        assert_eq!(parse_amount("42"), dec("42"));
        assert_eq!(parse_amount("1.234.567"), Decimal::ZERO);
    }

    #[test]
    fn test_parse_whitespace() {
        assert_eq!(parse_amount("  1 234,56 "), dec("1234.56"));
        assert_eq!(parse_amount("1\u{00a0}511\u{00a0}592.08"), dec("1511592.08"));
    }

    #[test]
    fn test_parse_garbage_is_zero() {
        assert_eq!(parse_amount(""), Decimal::ZERO);
        assert_eq!(parse_amount("   "), Decimal::ZERO);
        assert_eq!(parse_amount("abc"), Decimal::ZERO);
        assert_eq!(parse_amount("12.5x"), Decimal::ZERO);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec("1478575.98")), "$ 1.478.575,98");
        assert_eq!(format_amount(dec("33016.1")), "$ 33.016,10");
        assert_eq!(format_amount(dec("999")), "$ 999,00");
        assert_eq!(format_amount(dec("-1500.5")), "-$ 1.500,50");
        assert_eq!(format_amount(Decimal::ZERO), "");
    }
}
