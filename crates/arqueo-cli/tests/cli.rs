//! Command-line tests driving the `arqueo` binary.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const REPORT: &str = r#"Lote C 403279116
Fecha 13-MAR-24
Usuario CMAGALLANES   Cajero CAJA03
Importe Lote 1511592.08

Formas de Pago Importe Moneda
EFECTIVO 577119.40 PESOS
TARJETACR 527538.04 PESOS
TARJETADE 406934.64 PESOS

Por 1-Obras Sanitarias: 1478575.98
Por 2-Municipalidad: 33016.10
"#;

/// Temp dir holding an empty config file so the user's own config is never read.
fn workspace() -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, "{}").unwrap();
    let config = config.to_string_lossy().into_owned();
    (dir, config)
}

fn arqueo(config: &str) -> Command {
    let mut cmd = Command::cargo_bin("arqueo").unwrap();
    cmd.args(["--config", config]);
    cmd
}

#[test]
fn test_process_text_report_as_json() {
    let (dir, config) = workspace();
    let input = dir.path().join("lote.txt");
    fs::write(&input, REPORT).unwrap();

    arqueo(&config)
        .arg("process")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"batch_id\": \"403279116\""))
        .stdout(predicate::str::contains("\"total_a\": \"1478575.98\""))
        .stdout(predicate::str::contains("\"total_b\": \"33016.10\""))
        .stdout(predicate::str::contains("diagnostic_trace"));
}

#[test]
fn test_process_text_output_without_trace() {
    let (dir, config) = workspace();
    let input = dir.path().join("lote.txt");
    fs::write(&input, REPORT).unwrap();

    arqueo(&config)
        .args(["process", "-f", "text", "--no-trace"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Sanitation:     $ 1.478.575,98"))
        .stdout(predicate::str::contains("MIÉRCOLES 13/03/2024"))
        .stdout(predicate::str::contains("Trace:").not());
}

#[test]
fn test_process_validate_reports_issues() {
    let (dir, config) = workspace();
    let input = dir.path().join("partial.txt");
    fs::write(&input, "Usuario FGONZALEZ\nsin importes").unwrap();

    arqueo(&config)
        .args(["process", "--validate"])
        .arg(&input)
        .assert()
        .success()
        .stderr(predicate::str::contains("Missing batch id"))
        .stderr(predicate::str::contains("Grand total anchor not found"));
}

#[test]
fn test_process_empty_report_fails() {
    let (dir, config) = workspace();
    let input = dir.path().join("empty.txt");
    fs::write(&input, "\n\n").unwrap();

    arqueo(&config)
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("report text is empty"));
}

#[test]
fn test_process_rejects_unknown_extension() {
    let (dir, config) = workspace();
    let input = dir.path().join("scan.png");
    fs::write(&input, [0u8; 4]).unwrap();

    arqueo(&config)
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format"));
}

#[test]
fn test_batch_writes_outputs_and_summary() {
    let (dir, config) = workspace();
    fs::write(dir.path().join("a.txt"), REPORT).unwrap();
    fs::write(dir.path().join("b.txt"), "  ").unwrap();
    let out = dir.path().join("out");
    let pattern = dir.path().join("*.txt");

    arqueo(&config)
        .args(["batch", "--continue-on-error", "--summary", "-f", "csv", "-j", "2"])
        .arg(pattern.to_string_lossy().as_ref())
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 2 files"));

    let record = fs::read_to_string(out.join("a.csv")).unwrap();
    assert!(record.contains("403279116"));
    assert!(!out.join("b.csv").exists());

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert!(summary.contains("a.txt,success,403279116"));
    assert!(summary.contains("b.txt,error"));
}

#[test]
fn test_batch_stops_on_first_error() {
    let (dir, config) = workspace();
    fs::write(dir.path().join("empty.txt"), "").unwrap();
    let pattern = dir.path().join("*.txt");

    arqueo(&config)
        .arg("batch")
        .arg(pattern.to_string_lossy().as_ref())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}

#[test]
fn test_config_set_and_get() {
    let (_dir, config) = workspace();

    arqueo(&config)
        .args(["config", "set", "extraction.spatial_radius", "150"])
        .assert()
        .success();

    arqueo(&config)
        .args(["config", "get", "extraction.spatial_radius"])
        .assert()
        .success()
        .stdout(predicate::str::contains("150"));

    arqueo(&config)
        .args(["config", "get", "extraction.nope"])
        .assert()
        .failure();
}
