use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use stream_stats::error::LoadIssueCode;
use stream_stats::stats::engine::{
    AlbumProjection, CareerProjection, SongProjection, SummaryOutcome,
};
use stream_stats::stats::projection::BILLION;
use stream_stats::stats::util::truncate_with_ellipsis;

use crate::commands::{CommandReport, open_engine, projection_line, report_no_data};

const MILLION: u64 = 1_000_000;

#[derive(Debug, Clone)]
pub struct ProjectionOptions {
    pub data_dir: Option<PathBuf>,
    pub songs: usize,
}

#[derive(Debug, Serialize)]
struct ProjectionPayload<'a> {
    date: &'a str,
    career: Option<&'a CareerProjection>,
    albums: &'a [AlbumProjection],
    songs: &'a [SongProjection],
}

pub fn run(opts: &ProjectionOptions) -> Result<CommandReport> {
    let (paths, mut engine) = open_engine(opts.data_dir.clone())?;
    let mut report = CommandReport::new("projections");

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

    let milestones = engine.config().milestones.clone();
    report.detail(format!("date={}", summary.date));

    if let Some(career) = &summary.career_projection {
        report.detail(format!(
            "career {}",
            projection_line(
                &career.projection,
                career.rate,
                BILLION,
                "B",
                milestones.album_horizon_days
            )
        ));
    }

    if summary.album_projections.is_empty() {
        report.detail("albums: none tracked in today's snapshot");
    }
    for album in &summary.album_projections {
        report.detail(format!(
            "album {} {}",
            album.display,
            projection_line(
                &album.projection,
                album.rate,
                BILLION,
                "B",
                milestones.album_horizon_days
            )
        ));
    }

    let songs = &summary.song_projections[..opts.songs.min(summary.song_projections.len())];
    for song in songs {
        report.detail(format!(
            "song {} {}",
            truncate_with_ellipsis(&song.name, 40),
            projection_line(
                &song.projection,
                song.rate,
                MILLION,
                "M",
                milestones.song_horizon_days
            )
        ));
    }

    report.attach(&ProjectionPayload {
        date: &summary.date,
        career: summary.career_projection.as_ref(),
        albums: &summary.album_projections,
        songs,
    })?;
    Ok(report)
}
