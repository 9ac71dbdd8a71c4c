use anyhow::Result;
use std::path::PathBuf;
use stream_stats::error::LoadIssueCode;
use stream_stats::stats::engine::{DashboardSummary, SummaryOutcome};
use stream_stats::stats::projection::BILLION;
use stream_stats::stats::util::{group_thousands, truncate_with_ellipsis};

use crate::commands::{CommandReport, open_engine, projection_line, report_no_data, signed};

#[derive(Debug, Clone)]
pub struct SummaryOptions {
    pub data_dir: Option<PathBuf>,
    pub top: Option<usize>,
}

fn headline(report: &mut CommandReport, s: &DashboardSummary) {
    report.detail(format!("date={}", s.date));
    report.detail(format!("career_total={}", group_thousands(s.career_total)));
    report.detail(format!(
        "summed_daily_total=+{}",
        group_thousands(s.summed_daily_total)
    ));
    match s.metadata_daily_delta {
        Some(delta) => report.detail(format!("metadata_daily_delta={}", signed(delta))),
        None => report.detail("metadata_daily_delta=n/a"),
    }
    report.detail(format!(
        "listeners={} rank=#{} change={} peak=#{} ({})",
        group_thousands(s.listeners.count),
        s.listeners.rank,
        signed(s.listeners.change),
        s.listeners.peak_rank,
        group_thousands(s.listeners.peak_count),
    ));
    report.detail(format!(
        "songs_over_1b={} songs_over_100m={}",
        s.songs_over_billion, s.songs_over_hundred_million
    ));
    if let Some(top) = &s.top_daily_song {
        report.detail(format!(
            "top_daily_song={} +{}",
            top.row.name,
            group_thousands(top.row.daily_num)
        ));
    }
    if let Some(top) = &s.top_total_song {
        report.detail(format!(
            "top_total_song={} {}",
            top.name,
            group_thousands(top.streams_num)
        ));
    }
}

pub fn run(opts: &SummaryOptions) -> Result<CommandReport> {
    let (paths, mut engine) = open_engine(opts.data_dir.clone())?;
    let mut report = CommandReport::new("summary");
    report.detail(format!("data_dir={}", paths.data_dir.display()));

    let summary = match engine.summary()? {
        SummaryOutcome::NoData => {
            report_no_data(&mut report, &paths);
            return Ok(report);
        }
        SummaryOutcome::Failed { date, reason } => {
            report.coded_issue(
                LoadIssueCode::E003LatestLoadFailed,
                format!("error loading files for {date}: {reason}"),
            );
            return Ok(report);
        }
        SummaryOutcome::Ready(summary) => summary,
    };

    headline(&mut report, &summary);

    let horizons = engine.config().milestones.clone();
    if let Some(career) = &summary.career_projection {
        report.detail(format!(
            "career {}",
            projection_line(
                &career.projection,
                career.rate,
                BILLION,
                "B",
                horizons.album_horizon_days
            )
        ));
    }

    let top = opts.top.unwrap_or(engine.config().display.top_songs);
    for (idx, song) in summary.songs.iter().take(top).enumerate() {
        report.detail(format!(
            "song #{} {} daily={} change={} share={}",
            idx + 1,
            truncate_with_ellipsis(&song.row.name, 48),
            group_thousands(song.row.daily_num),
            signed(song.change),
            song.share,
        ));
    }

    if let Some(albums) = &summary.albums {
        for album in albums {
            report.detail(format!(
                "album {} daily={} change={} daily_share={} total={} total_share={}",
                album.delta.row.base_name,
                group_thousands(album.delta.row.daily_num),
                signed(album.delta.change),
                album.delta.share,
                group_thousands(album.delta.row.total_num),
                album.total_share,
            ));
        }
    }

    report.attach(&summary)?;
    Ok(report)
}
