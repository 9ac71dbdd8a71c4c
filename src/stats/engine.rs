//! Request-scoped facade over the loader, aggregator, calculator and
//! projector, with the two expiry caches in front of the file scans.

use crate::stats::cache::TtlCache;
use crate::stats::config::StatsConfig;
use crate::stats::delta::{
    AlbumDelta, SongDelta, compute_album_deltas, compute_deltas, count_at_or_above,
    signed_change, sort_by_daily_desc, summed_daily,
};
use crate::stats::history::{self, SeriesPoint};
use crate::stats::normalize::TableKind;
use crate::stats::projection::{
    BILLION, HUNDRED_MILLION, MilestoneProjection, effective_rate, project,
};
use crate::stats::snapshot::{self, LatestLoad, LatestPair, SongRow};
use crate::stats::util::{Clock, SystemClock};
use anyhow::Result;
use chrono::NaiveDateTime;
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeriesKey {
    Career,
    Listeners,
    Item(TableKind, String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ListenerSummary {
    pub count: u64,
    pub change: i64,
    pub rank: u64,
    pub peak_rank: u64,
    pub peak_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlbumProjection {
    pub display: String,
    pub base_name: String,
    pub total: u64,
    pub rate: f64,
    pub projection: MilestoneProjection,
}

#[derive(Debug, Clone, Serialize)]
pub struct CareerProjection {
    pub rate: f64,
    pub projection: MilestoneProjection,
}

#[derive(Debug, Clone, Serialize)]
pub struct SongProjection {
    pub name: String,
    pub streams: u64,
    pub rate: f64,
    pub projection: MilestoneProjection,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub date: String,
    pub career_total: u64,
    /// Sum of today's per-song increments; the share denominator.
    pub summed_daily_total: u64,
    /// Day-over-day change of the metadata career total. Not reconciled
    /// with `summed_daily_total`.
    pub metadata_daily_delta: Option<i64>,
    pub listeners: ListenerSummary,
    pub songs_over_billion: usize,
    pub songs_over_hundred_million: usize,
    pub top_daily_song: Option<SongDelta>,
    pub top_total_song: Option<SongRow>,
    pub songs: Vec<SongDelta>,
    pub albums: Option<Vec<AlbumDelta>>,
    pub career_projection: Option<CareerProjection>,
    pub album_projections: Vec<AlbumProjection>,
    pub song_projections: Vec<SongProjection>,
}

#[derive(Debug, Clone)]
pub enum SummaryOutcome {
    NoData,
    Failed { date: String, reason: String },
    Ready(Box<DashboardSummary>),
}

pub struct StatsEngine {
    data_dir: PathBuf,
    config: StatsConfig,
    tz: Tz,
    clock: Box<dyn Clock>,
    latest: TtlCache<(), LatestLoad>,
    series: TtlCache<SeriesKey, Vec<SeriesPoint>>,
    song_averages: TtlCache<usize, BTreeMap<String, f64>>,
    entity_averages: TtlCache<(TableKind, String), f64>,
}

impl StatsEngine {
    pub fn new(data_dir: impl Into<PathBuf>, config: StatsConfig) -> Result<Self> {
        Self::with_clock(data_dir, config, Box::new(SystemClock))
    }

    pub fn with_clock(
        data_dir: impl Into<PathBuf>,
        config: StatsConfig,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        let tz = config.timezone()?;
        let snapshot_ttl = config.cache.snapshot_ttl_secs;
        let history_ttl = config.cache.history_ttl_secs;
        Ok(Self {
            data_dir: data_dir.into(),
            config,
            tz,
            clock,
            latest: TtlCache::new(snapshot_ttl),
            series: TtlCache::new(history_ttl),
            song_averages: TtlCache::new(history_ttl),
            entity_averages: TtlCache::new(history_ttl),
        })
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn local_now(&self) -> NaiveDateTime {
        self.clock.local_now(self.tz)
    }

    pub fn latest(&mut self) -> LatestLoad {
        if let Some(hit) = self.latest.get(&(), self.clock.as_ref()) {
            return hit;
        }
        let loaded = snapshot::load_latest_pair(&self.data_dir);
        // A failed latest load is retried on the next request.
        if !matches!(loaded, LatestLoad::Failed { .. }) {
            self.latest.insert((), loaded.clone(), self.clock.as_ref());
        }
        loaded
    }

    fn cached_series(
        &mut self,
        key: SeriesKey,
        load: impl FnOnce(&Path) -> Result<Vec<SeriesPoint>>,
    ) -> Result<Vec<SeriesPoint>> {
        let dir = self.data_dir.clone();
        let label = format!("{key:?}");
        self.series
            .get_or_try_insert_with(key, self.clock.as_ref(), || {
                debug!(series = %label, "rebuilding history series");
                load(&dir)
            })
    }

    pub fn career_history(&mut self) -> Result<Vec<SeriesPoint>> {
        let ceiling = self.config.history.implausible_delta_ceiling;
        self.cached_series(SeriesKey::Career, |dir| {
            history::career_daily_history(dir, ceiling)
        })
    }

    pub fn listeners_history(&mut self) -> Result<Vec<SeriesPoint>> {
        self.cached_series(SeriesKey::Listeners, history::listeners_history)
    }

    pub fn item_history(&mut self, kind: TableKind, name: &str) -> Result<Vec<SeriesPoint>> {
        let owned = name.to_string();
        self.cached_series(SeriesKey::Item(kind, owned.clone()), |dir| {
            history::item_history(dir, kind, &owned)
        })
    }

    pub fn song_trailing_averages(&mut self) -> Result<BTreeMap<String, f64>> {
        let window = self.config.history.trailing_window;
        let dir = self.data_dir.clone();
        self.song_averages
            .get_or_try_insert_with(window, self.clock.as_ref(), || {
                history::song_trailing_averages(&dir, window)
            })
    }

    pub fn entity_trailing_average(&mut self, kind: TableKind, name: &str) -> Result<f64> {
        let window = self.config.history.trailing_window;
        let dir = self.data_dir.clone();
        self.entity_averages.get_or_try_insert_with(
            (kind, name.to_string()),
            self.clock.as_ref(),
            || history::entity_trailing_average(&dir, kind, name, window),
        )
    }

    pub fn summary(&mut self) -> Result<SummaryOutcome> {
        let pair = match self.latest() {
            LatestLoad::NoData => return Ok(SummaryOutcome::NoData),
            LatestLoad::Failed { date, reason } => {
                return Ok(SummaryOutcome::Failed { date, reason });
            }
            LatestLoad::Loaded(pair) => pair,
        };
        let summary = self.build_summary(&pair)?;
        info!(
            date = %summary.date,
            songs = summary.songs.len(),
            summed_daily_total = summary.summed_daily_total,
            "dashboard summary ready"
        );
        Ok(SummaryOutcome::Ready(Box::new(summary)))
    }

    fn build_summary(&mut self, pair: &LatestPair) -> Result<DashboardSummary> {
        let today = &pair.today;
        let previous = pair.previous.as_ref();
        let career_total = today.meta.career_total;
        let summed_daily_total = summed_daily(&today.songs);

        let mut songs = compute_deltas(
            &today.songs,
            previous.map(|p| p.songs.as_slice()),
            summed_daily_total,
        );
        sort_by_daily_desc(&mut songs);

        let albums = today.albums.as_ref().map(|current| {
            let prev = previous.and_then(|p| p.albums.as_deref());
            let mut rows = compute_album_deltas(current, prev, summed_daily_total, career_total);
            rows.sort_by(|a, b| b.delta.row.daily_num.cmp(&a.delta.row.daily_num));
            rows
        });

        let metadata_daily_delta =
            previous.map(|p| signed_change(career_total, p.meta.career_total));

        let listener_series = self.listeners_history()?;
        let listeners = ListenerSummary {
            count: today.meta.listener_count(),
            change: history::listeners_change(&listener_series),
            rank: today.meta.listeners_rank,
            peak_rank: today.meta.listeners_peak,
            peak_count: today.meta.listeners_pk_count,
        };

        let top_total_song = today
            .songs
            .iter()
            .max_by_key(|s| s.streams_num)
            .cloned();

        let career_projection = self.career_projection(career_total, summed_daily_total)?;
        let album_projections = self.album_projections(pair)?;
        let song_projections = self.song_projections(&today.songs)?;

        Ok(DashboardSummary {
            date: today.date.clone(),
            career_total,
            summed_daily_total,
            metadata_daily_delta,
            listeners,
            songs_over_billion: count_at_or_above(&today.songs, BILLION),
            songs_over_hundred_million: count_at_or_above(&today.songs, HUNDRED_MILLION),
            top_daily_song: songs.first().cloned(),
            top_total_song,
            songs,
            albums,
            career_projection,
            album_projections,
            song_projections,
        })
    }

    fn career_projection(
        &mut self,
        career_total: u64,
        summed_daily_total: u64,
    ) -> Result<Option<CareerProjection>> {
        let window = self.config.history.trailing_window;
        let series = self.career_history()?;
        let recent = &series[series.len().saturating_sub(window)..];
        let rate = effective_rate(history::series_mean(recent), summed_daily_total);
        let projection = project(
            career_total,
            rate,
            self.config.milestones.career_granularity,
            self.local_now(),
        );
        Ok(projection.map(|projection| CareerProjection { rate, projection }))
    }

    /// Projections for the configured albums present today, largest first.
    pub fn album_projections(&mut self, pair: &LatestPair) -> Result<Vec<AlbumProjection>> {
        let Some(albums) = pair.today.albums.as_ref() else {
            return Ok(Vec::new());
        };
        let granularity = self.config.milestones.album_granularity;
        let now = self.local_now();
        let tracked = self.config.albums.clone();

        let mut out = Vec::new();
        for album in tracked {
            let Some(row) = albums.iter().find(|a| a.base_name == album.base_name) else {
                continue;
            };
            let average = self.entity_trailing_average(TableKind::Albums, &album.base_name)?;
            let rate = effective_rate(Some(average), row.daily_num);
            if let Some(projection) = project(row.total_num, rate, granularity, now) {
                out.push(AlbumProjection {
                    display: album.display,
                    base_name: album.base_name,
                    total: row.total_num,
                    rate,
                    projection,
                });
            }
        }
        out.sort_by(|a, b| b.total.cmp(&a.total));
        Ok(out)
    }

    /// Projections for every song, largest lifetime total first.
    pub fn song_projections(&mut self, songs: &[SongRow]) -> Result<Vec<SongProjection>> {
        let averages = self.song_trailing_averages()?;
        let granularity = self.config.milestones.song_granularity;
        let now = self.local_now();

        let mut out = songs
            .iter()
            .filter_map(|song| {
                let rate = effective_rate(averages.get(&song.name).copied(), song.daily_num);
                project(song.streams_num, rate, granularity, now).map(|projection| {
                    SongProjection {
                        name: song.name.clone(),
                        streams: song.streams_num,
                        rate,
                        projection,
                    }
                })
            })
            .collect::<Vec<_>>();
        out.sort_by(|a, b| b.streams.cmp(&a.streams));
        Ok(out)
    }
}
