//! Report export: JSON session reports and CSV batch tables.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::batch::SeedOutcome;
use crate::session::SessionReport;

/// Current schema version for exported reports.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ReportEnvelope {
    schema_version: u32,
    #[serde(flatten)]
    report: SessionReport,
}

/// Serialize a session report to pretty JSON.
pub fn export_json(report: &SessionReport) -> Result<String> {
    let envelope = ReportEnvelope {
        schema_version: SCHEMA_VERSION,
        report: report.clone(),
    };
    serde_json::to_string_pretty(&envelope).context("failed to serialize session report")
}

/// Deserialize a session report, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<SessionReport> {
    let envelope: ReportEnvelope =
        serde_json::from_str(json).context("failed to deserialize session report")?;
    if envelope.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            envelope.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(envelope.report)
}

pub fn write_json(report: &SessionReport, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    fs::write(path, export_json(report)?)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Batch outcomes as CSV, one row per seed.
pub fn export_batch_csv(outcomes: &[SeedOutcome]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "seed",
        "session_id",
        "settled",
        "wins",
        "losses",
        "neutrals",
        "win_rate",
        "net_pnl",
        "final_balance",
    ])?;
    for o in outcomes {
        let s = &o.summary;
        wtr.write_record([
            &o.seed.to_string(),
            &o.session_id,
            &s.total_settled.to_string(),
            &s.wins.to_string(),
            &s.losses.to_string(),
            &s.neutrals.to_string(),
            &format!("{:.4}", s.win_rate),
            &format!("{:.2}", s.net_pnl),
            &format!("{:.2}", s.current_balance),
        ])?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::PerformanceSummary;

    fn report() -> SessionReport {
        SessionReport {
            session_id: "abc".into(),
            seed: 42,
            steps: 10,
            candles_sealed: 3,
            summary: PerformanceSummary::from_positions(std::iter::empty(), 10_000.0, 10_000.0),
            positions: vec![],
        }
    }

    #[test]
    fn json_round_trip() {
        let json = export_json(&report()).unwrap();
        assert!(json.contains("\"schema_version\": 1"));
        assert_eq!(import_json(&json).unwrap(), report());
    }

    #[test]
    fn rejects_future_schema() {
        let json = export_json(&report())
            .unwrap()
            .replace("\"schema_version\": 1", "\"schema_version\": 99");
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn batch_csv_has_header_and_rows() {
        let outcomes = vec![SeedOutcome {
            seed: 1,
            session_id: "id".into(),
            summary: PerformanceSummary::from_positions(std::iter::empty(), 100.0, 100.0),
        }];
        let csv = export_batch_csv(&outcomes).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("seed,session_id"));
        assert!(lines[1].starts_with("1,id,0,0,0,0,0.0000,0.00,100.00"));
    }

    #[test]
    fn write_json_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run.json");
        write_json(&report(), &path).unwrap();
        assert!(path.exists());
    }
}
