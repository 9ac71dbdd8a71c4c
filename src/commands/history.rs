use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use stream_stats::stats::history::{SeriesPoint, series_mean};
use stream_stats::stats::normalize::{TableKind, clean_name};
use stream_stats::stats::util::group_thousands;

use crate::commands::{CommandReport, open_engine, report_no_data};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesSelector {
    Career,
    Listeners,
    Song(String),
    Album(String),
}

impl SeriesSelector {
    fn label(&self) -> String {
        match self {
            Self::Career => "career".to_string(),
            Self::Listeners => "listeners".to_string(),
            Self::Song(name) => format!("song:{}", clean_name(name)),
            Self::Album(base) => format!("album:{}", base.trim()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryOptions {
    pub data_dir: Option<PathBuf>,
    pub series: SeriesSelector,
}

#[derive(Debug, Serialize)]
struct SeriesPayload<'a> {
    series: String,
    mean: Option<f64>,
    points: &'a [SeriesPoint],
}

pub fn run(opts: &HistoryOptions) -> Result<CommandReport> {
    let (paths, mut engine) = open_engine(opts.data_dir.clone())?;
    let mut report = CommandReport::new("history");
    let label = opts.series.label();
    report.detail(format!("series={label}"));

    let points = match &opts.series {
        SeriesSelector::Career => engine.career_history()?,
        SeriesSelector::Listeners => engine.listeners_history()?,
        SeriesSelector::Song(name) => engine.item_history(TableKind::Songs, &clean_name(name))?,
        SeriesSelector::Album(base) => engine.item_history(TableKind::Albums, base.trim())?,
    };

    if points.is_empty() {
        if !paths.data_dir.exists() {
            report_no_data(&mut report, &paths);
        } else {
            report.issue(format!(
                "no history points for {label} in {}",
                paths.data_dir.display()
            ));
        }
        return Ok(report);
    }

    for point in &points {
        report.detail(format!("{} {}", point.date, group_thousands(point.value)));
    }
    let mean = series_mean(&points);
    if let Some(mean) = mean {
        report.detail(format!(
            "points={} mean={}",
            points.len(),
            group_thousands(mean.round() as u64)
        ));
    }

    report.attach(&SeriesPayload {
        series: label,
        mean,
        points: &points,
    })?;
    Ok(report)
}
