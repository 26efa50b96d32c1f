//! Record rendering shared by the process and batch commands.

use serde::Serialize;

use arqueo_core::{ReportRecord, format_amount};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// XML output
    Xml,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    /// Parse a format name as stored in the configuration file.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "xml" => Some(Self::Xml),
            "text" | "txt" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xml => "xml",
            Self::Text => "txt",
        }
    }
}

/// Flat, string-valued view of a record for CSV and XML.
#[derive(Debug, Serialize)]
#[serde(rename = "report")]
pub struct RecordRow {
    pub batch_id: String,
    pub date: String,
    pub day: String,
    pub user: String,
    pub cashier: String,
    pub cash: String,
    pub credit_card: String,
    pub debit_card: String,
    pub deferred_check: String,
    pub card_total: String,
    pub expected_cash: String,
    pub total_a: String,
    pub total_b: String,
    pub grand_total: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl RecordRow {
    pub fn new(record: &ReportRecord, include_trace: bool) -> Self {
        Self {
            batch_id: record.batch_id.clone(),
            date: record.date_string(),
            day: record.day_name().to_string(),
            user: record.user.clone(),
            cashier: record.cashier.clone(),
            cash: record.cash.to_string(),
            credit_card: record.credit_card.to_string(),
            debit_card: record.debit_card.to_string(),
            deferred_check: record.deferred_check.to_string(),
            card_total: record.card_total().to_string(),
            expected_cash: record.expected_cash().to_string(),
            total_a: record.total_a.to_string(),
            total_b: record.total_b.to_string(),
            grand_total: record.grand_total.to_string(),
            status: record.outcome.to_string(),
            trace: include_trace.then(|| record.diagnostic_trace.to_string()),
        }
    }
}

pub fn format_record(
    record: &ReportRecord,
    format: OutputFormat,
    include_trace: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => format_json(record, include_trace),
        OutputFormat::Csv => format_csv(record),
        OutputFormat::Xml => format_xml(record, include_trace),
        OutputFormat::Text => Ok(format_text(record, include_trace)),
    }
}

fn format_json(record: &ReportRecord, include_trace: bool) -> anyhow::Result<String> {
    let mut value = serde_json::to_value(record)?;
    if !include_trace {
        if let Some(obj) = value.as_object_mut() {
            obj.remove("diagnostic_trace");
        }
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

fn format_csv(record: &ReportRecord) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    // The trace is multi-line and stays out of tabular output
    wtr.serialize(RecordRow::new(record, false))?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_xml(record: &ReportRecord, include_trace: bool) -> anyhow::Result<String> {
    let row = RecordRow::new(record, include_trace);
    Ok(quick_xml::se::to_string(&row)?)
}

fn format_text(record: &ReportRecord, include_trace: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!("Batch:   {}\n", record.batch_id));
    output.push_str(&format!(
        "Date:    {} {}\n",
        record.day_name(),
        record.date_string()
    ));
    output.push_str(&format!("User:    {}\n", record.user));
    output.push_str(&format!("Cashier: {}\n", record.cashier));
    output.push('\n');

    output.push_str("Payments:\n");
    output.push_str(&format!("  Cash:           {}\n", format_amount(record.cash)));
    output.push_str(&format!("  Credit card:    {}\n", format_amount(record.credit_card)));
    output.push_str(&format!("  Debit card:     {}\n", format_amount(record.debit_card)));
    output.push_str(&format!("  Deferred check: {}\n", format_amount(record.deferred_check)));
    output.push('\n');

    output.push_str("Totals:\n");
    output.push_str(&format!("  Sanitation:     {}\n", format_amount(record.total_a)));
    output.push_str(&format!("  Municipal:      {}\n", format_amount(record.total_b)));
    output.push_str(&format!("  Batch total:    {}\n", format_amount(record.grand_total)));
    output.push_str(&format!("  Expected cash:  {}\n", format_amount(record.expected_cash())));
    output.push('\n');

    output.push_str(&format!("Status: {}\n", record.outcome));

    if include_trace && !record.diagnostic_trace.is_empty() {
        output.push_str("\nTrace:\n");
        for line in record.diagnostic_trace.lines() {
            output.push_str(&format!("  {}\n", line));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use arqueo_core::ReportParser;

    const REPORT: &str = "Lote C 77\nFecha 01-ENE-24\nImporte Lote 3500.50\nTotal Importe: 2500.00\nTotal Importe: 1000.50";

    fn record() -> ReportRecord {
        ReportParser::new().without_geometry().parse(REPORT).unwrap()
    }

    #[test]
    fn test_format_from_name() {
        assert_eq!(OutputFormat::from_name("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_name("txt"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::from_name("yaml"), None);
    }

    #[test]
    fn test_json_without_trace() {
        let json = format_record(&record(), OutputFormat::Json, false).unwrap();
        assert!(json.contains("\"batch_id\": \"77\""));
        assert!(!json.contains("diagnostic_trace"));
    }

    #[test]
    fn test_csv_has_header_and_row() {
        let csv = format_record(&record(), OutputFormat::Csv, true).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("batch_id,date,day,"));
        assert!(!lines[0].contains("trace"));
        assert!(lines[1].starts_with("77,01/01/2024,LUNES,"));
    }

    #[test]
    fn test_xml_root() {
        let xml = format_record(&record(), OutputFormat::Xml, true).unwrap();
        assert!(xml.starts_with("<report>"));
        assert!(xml.contains("<total_a>2500.00</total_a>"));
        assert!(xml.contains("<trace>"));
    }

    #[test]
    fn test_text_summary() {
        let text = format_record(&record(), OutputFormat::Text, false).unwrap();
        assert!(text.contains("Sanitation:     $ 2.500,00"));
        assert!(text.contains("Municipal:      $ 1.000,50"));
        assert!(!text.contains("Trace:"));
    }
}
