use anyhow::Result;
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use stream_stats::stats::config::load_config;
use stream_stats::stats::normalize::TableKind;
use stream_stats::stats::snapshot::{META_SUFFIX, discover};

use crate::commands::{CommandReport, report_no_data, resolve_with_override};

include!(concat!(env!("OUT_DIR"), "/stats_env_allowlist.rs"));

#[derive(Debug, Clone, Default, Serialize)]
pub struct FileCounts {
    pub songs: usize,
    pub albums: usize,
    pub meta: usize,
    pub latest_date: Option<String>,
}

/// `STATS_*` variables in `vars` that no code path reads.
pub fn unknown_stats_env_keys<I>(vars: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut unknown = vars
        .into_iter()
        .filter(|key| key.starts_with("STATS_"))
        .filter(|key| !GENERATED_STATS_ENV_ALLOWLIST.contains(&key.as_str()))
        .collect::<Vec<_>>();
    unknown.sort();
    unknown.dedup();
    unknown
}

pub fn run(data_dir: Option<PathBuf>) -> Result<CommandReport> {
    let paths = resolve_with_override(data_dir)?;
    let mut report = CommandReport::new("status");

    report.detail(format!("stats_home={}", paths.stats_home.display()));
    report.detail(format!("data_dir={}", paths.data_dir.display()));
    report.detail(format!(
        "config_file={} (present={})",
        paths.config_file.display(),
        paths.config_file.exists()
    ));

    match load_config(&paths.config_file) {
        Ok(cfg) => {
            report.detail(format!(
                "cache.snapshot_ttl_secs={} cache.history_ttl_secs={}",
                cfg.cache.snapshot_ttl_secs, cfg.cache.history_ttl_secs
            ));
            report.detail(format!(
                "history.trailing_window={} history.implausible_delta_ceiling={}",
                cfg.history.trailing_window, cfg.history.implausible_delta_ceiling
            ));
            report.detail(format!(
                "milestones.album_horizon_days={} milestones.song_horizon_days={}",
                cfg.milestones.album_horizon_days, cfg.milestones.song_horizon_days
            ));
            report.detail(format!("display.timezone={}", cfg.display.timezone));
            report.detail(format!("tracked_albums={}", cfg.albums.len()));
        }
        Err(err) => report.issue(format!("config: {err:#}")),
    }

    let songs = discover(&paths.data_dir, TableKind::Songs.file_suffix())?;
    let counts = FileCounts {
        songs: songs.len(),
        albums: discover(&paths.data_dir, TableKind::Albums.file_suffix())?.len(),
        meta: discover(&paths.data_dir, META_SUFFIX)?.len(),
        latest_date: songs.last().map(|f| f.date.clone()),
    };
    report.detail(format!(
        "files songs={} albums={} meta={}",
        counts.songs, counts.albums, counts.meta
    ));
    match &counts.latest_date {
        Some(date) => report.detail(format!("latest_date={date}")),
        None => report_no_data(&mut report, &paths),
    }

    for key in unknown_stats_env_keys(env::vars().map(|(k, _)| k)) {
        report.issue(format!("unknown env key {key}"));
    }

    report.attach(&counts)?;
    Ok(report)
}
