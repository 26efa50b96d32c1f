//! Common regex patterns for batch report extraction.
//!
//! Amount captures use `\d(?:[\d.,]*\d)?` so a trailing sentence period or
//! comma never becomes part of the number.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Identity values
    pub static ref SHORT_DATE: Regex = Regex::new(
        r"^\d{2}-[A-Za-z]{3}-\d{2}"
    ).unwrap();

    // Payment summary section
    pub static ref PAYMENT_SECTION: Regex = Regex::new(
        r"(?s)Formas\s+de\s+Pago\s+Importe\s+Moneda\s*(.*?)(?:\n[ \t\r]*\n|Por \d+-Municipalidad|$)"
    ).unwrap();

    // Grand total anchor
    pub static ref GRAND_TOTAL: Regex = Regex::new(
        r"Importe Lote\s*(\d(?:[\d.,]*\d)?)"
    ).unwrap();

    // Anchored subtotals
    pub static ref SANITATION_TOTAL: Regex = Regex::new(
        r"(?s)Total Recibos en el lote de Obras Sanitarias.*?Total Importe:\s*(\d(?:[\d.,]*\d)?)"
    ).unwrap();

    pub static ref MUNICIPAL_ROW_TOTAL: Regex = Regex::new(
        r"(?s)Por \d+-Municipalidad.*?\n\d+\s+(\d(?:[\d.,]*\d)?)"
    ).unwrap();

    pub static ref MUNICIPAL_SUMMARY_TOTAL: Regex = Regex::new(
        r"(?s)Por \d+-Municipalidad.*?Total Recibos Cobrados:.*?Total Importe:\s*(\d(?:[\d.,]*\d)?)"
    ).unwrap();

    // Generic total-like labels
    pub static ref TOTAL_AMOUNT_LABEL: Regex = Regex::new(
        r"Total Importe:\s*(\d(?:[\d.,]*\d)?)"
    ).unwrap();

    pub static ref SECTION_AMOUNT_LABEL: Regex = Regex::new(
        r"Por \d+-[^:]*:\s*(\d(?:[\d.,]*\d)?)"
    ).unwrap();

    // Whole-token currency amount with two decimals, grouped or not
    pub static ref STRICT_AMOUNT: Regex = Regex::new(
        r"^(?:\d{1,3}(?:[.,]\d{3})+|\d+)[.,]\d{2}$"
    ).unwrap();
}
