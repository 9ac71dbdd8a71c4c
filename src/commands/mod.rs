pub mod history;
pub mod projections;
pub mod status;
pub mod summary;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use stream_stats::error::LoadIssueCode;
use stream_stats::stats::config::load_config;
use stream_stats::stats::engine::StatsEngine;
use stream_stats::stats::paths::{StatsPaths, resolve_paths};
use stream_stats::stats::projection::MilestoneProjection;
use stream_stats::stats::util::group_thousands;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
            data: None,
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn coded_issue(&mut self, code: LoadIssueCode, text: impl AsRef<str>) {
        self.issue(format!("{} {}", code.as_str(), text.as_ref()));
    }

    pub fn attach(&mut self, data: &impl Serialize) -> Result<()> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(())
    }
}

pub fn resolve_with_override(data_dir: Option<PathBuf>) -> Result<StatsPaths> {
    let mut paths = resolve_paths()?;
    if let Some(dir) = data_dir {
        paths.data_dir = dir;
    }
    Ok(paths)
}

pub fn open_engine(data_dir: Option<PathBuf>) -> Result<(StatsPaths, StatsEngine)> {
    let paths = resolve_with_override(data_dir)?;
    let cfg = load_config(&paths.config_file)?;
    let engine = StatsEngine::new(paths.data_dir.clone(), cfg)?;
    Ok((paths, engine))
}

/// Records why there is nothing to show: no directory or no files yet.
pub fn report_no_data(report: &mut CommandReport, paths: &StatsPaths) {
    if paths.data_dir.exists() {
        report.coded_issue(
            LoadIssueCode::E002NoSnapshots,
            format!("no *_songs.csv snapshots in {}", paths.data_dir.display()),
        );
    } else {
        report.coded_issue(
            LoadIssueCode::E001NoDataDir,
            format!("data dir not found: {}", paths.data_dir.display()),
        );
    }
}

pub fn signed(value: i64) -> String {
    if value < 0 {
        format!("-{}", group_thousands(value.unsigned_abs()))
    } else {
        format!("+{}", group_thousands(value.unsigned_abs()))
    }
}

/// `next=2B remaining=123 avg=+45/day eta=2025-03-01 (40 days)`; the date is
/// replaced by `---` beyond `horizon_days`.
pub fn projection_line(
    projection: &MilestoneProjection,
    rate: f64,
    unit: u64,
    unit_suffix: &str,
    horizon_days: f64,
) -> String {
    let next = projection.milestone / unit.max(1);
    let eta = if projection.within_horizon(horizon_days) {
        format!(
            "{} ({} days)",
            projection.eta_label(),
            projection.days.trunc() as u64
        )
    } else {
        "--- (N/A)".to_string()
    };
    format!(
        "next={next}{unit_suffix} remaining={} avg=+{}/day eta={eta}",
        group_thousands(projection.remaining),
        group_thousands(rate.max(0.0) as u64),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_formats_both_directions() {
        assert_eq!(signed(1_500), "+1,500");
        assert_eq!(signed(-20), "-20");
        assert_eq!(signed(0), "+0");
    }

    #[test]
    fn projection_line_hides_date_beyond_horizon() {
        let near = MilestoneProjection {
            milestone: 2_000_000_000,
            remaining: 300_000_000,
            days: 30.4,
            eta_date: chrono::NaiveDate::from_ymd_opt(2025, 1, 31),
        };
        assert_eq!(
            projection_line(&near, 10_000_000.0, 1_000_000_000, "B", 7300.0),
            "next=2B remaining=300,000,000 avg=+10,000,000/day eta=2025-01-31 (30 days)"
        );

        let far = MilestoneProjection {
            days: f64::INFINITY,
            eta_date: None,
            ..near
        };
        assert!(projection_line(&far, 0.0, 1_000_000_000, "B", 7300.0).ends_with("eta=--- (N/A)"));
    }
}
