use crate::error::StatsError;
use crate::stats::history::DEFAULT_IMPLAUSIBLE_DELTA;
use crate::stats::projection::{BILLION, HUNDRED_MILLION};
use anyhow::Result;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub snapshot_ttl_secs: u64,
    pub history_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl_secs: 600,
            history_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub trailing_window: usize,
    #[serde(alias = "delta_ceiling")]
    pub implausible_delta_ceiling: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            trailing_window: 7,
            implausible_delta_ceiling: DEFAULT_IMPLAUSIBLE_DELTA,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneConfig {
    pub career_granularity: u64,
    pub album_granularity: u64,
    pub song_granularity: u64,
    pub album_horizon_days: f64,
    pub song_horizon_days: f64,
}

impl Default for MilestoneConfig {
    fn default() -> Self {
        Self {
            career_granularity: BILLION,
            album_granularity: BILLION,
            song_granularity: HUNDRED_MILLION,
            album_horizon_days: 7300.0,
            song_horizon_days: 3650.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub timezone: String,
    pub top_songs: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            top_songs: 150,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedAlbum {
    pub display: String,
    pub base_name: String,
}

fn tracked(display: &str, base_name: &str) -> TrackedAlbum {
    TrackedAlbum {
        display: display.to_string(),
        base_name: base_name.to_string(),
    }
}

pub fn default_tracked_albums() -> Vec<TrackedAlbum> {
    vec![
        tracked("Yours Truly", "Yours Truly"),
        tracked("My Everything", "My Everything"),
        tracked("Dangerous Woman", "Dangerous Woman"),
        tracked("Sweetener", "Sweetener"),
        tracked("thank u, next", "thank u, next"),
        tracked("Positions", "Positions"),
        tracked(
            "eternal sunshine (deluxe)",
            "eternal sunshine deluxe: brighter days ahead",
        ),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    pub cache: CacheConfig,
    pub history: HistoryConfig,
    pub milestones: MilestoneConfig,
    pub display: DisplayConfig,
    pub albums: Vec<TrackedAlbum>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            history: HistoryConfig::default(),
            milestones: MilestoneConfig::default(),
            display: DisplayConfig::default(),
            albums: default_tracked_albums(),
        }
    }
}

impl StatsConfig {
    pub fn timezone(&self) -> Result<Tz> {
        self.display
            .timezone
            .parse::<Tz>()
            .map_err(|_| invalid(format!("unknown timezone `{}`", self.display.timezone)).into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialStatsConfig {
    cache: Option<CacheConfig>,
    history: Option<HistoryConfig>,
    milestones: Option<MilestoneConfig>,
    display: Option<DisplayConfig>,
    albums: Option<Vec<TrackedAlbum>>,
}

fn invalid(msg: impl Into<String>) -> StatsError {
    StatsError::InvalidConfig(msg.into())
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_f64(var: &str, fallback: f64) -> f64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<f64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

pub fn validate(cfg: &StatsConfig) -> Result<()> {
    if cfg.cache.snapshot_ttl_secs == 0 || cfg.cache.history_ttl_secs == 0 {
        return Err(invalid("cache ttl must be >= 1 second").into());
    }
    if cfg.history.trailing_window == 0 {
        return Err(invalid("trailing window must be >= 1 file").into());
    }
    if cfg.history.implausible_delta_ceiling == 0 {
        return Err(invalid("implausible delta ceiling must be > 0").into());
    }
    let m = &cfg.milestones;
    if m.career_granularity == 0 || m.album_granularity == 0 || m.song_granularity == 0 {
        return Err(invalid("milestone granularity must be > 0").into());
    }
    if !(m.album_horizon_days > 0.0 && m.song_horizon_days > 0.0) {
        return Err(invalid("eta horizon must be > 0 days").into());
    }
    if cfg
        .albums
        .iter()
        .any(|a| a.base_name.trim().is_empty() || a.display.trim().is_empty())
    {
        return Err(invalid("tracked album entries need `display` and `base_name`").into());
    }
    cfg.timezone()?;
    Ok(())
}

fn merge_file_config(base: &mut StatsConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)
        .map_err(|err| invalid(format!("failed to read {}: {err}", path.display())))?;
    let parsed: PartialStatsConfig = toml::from_str(&raw)
        .map_err(|err| invalid(format!("failed to parse {}: {err}", path.display())))?;
    if let Some(cache) = parsed.cache {
        base.cache = cache;
    }
    if let Some(history) = parsed.history {
        base.history = history;
    }
    if let Some(milestones) = parsed.milestones {
        base.milestones = milestones;
    }
    if let Some(display) = parsed.display {
        base.display = display;
    }
    if let Some(albums) = parsed.albums {
        base.albums = albums;
    }
    Ok(())
}

fn apply_env_overrides(cfg: &mut StatsConfig) {
    cfg.cache.snapshot_ttl_secs = env_or_u64("STATS_SNAPSHOT_TTL_SECS", cfg.cache.snapshot_ttl_secs);
    cfg.cache.history_ttl_secs = env_or_u64("STATS_HISTORY_TTL_SECS", cfg.cache.history_ttl_secs);
    cfg.history.trailing_window =
        env_or_usize("STATS_TRAILING_WINDOW", cfg.history.trailing_window);
    cfg.history.implausible_delta_ceiling = env_or_u64(
        "STATS_IMPLAUSIBLE_DELTA",
        cfg.history.implausible_delta_ceiling,
    );
    cfg.milestones.career_granularity = env_or_u64(
        "STATS_CAREER_GRANULARITY",
        cfg.milestones.career_granularity,
    );
    cfg.milestones.album_granularity =
        env_or_u64("STATS_ALBUM_GRANULARITY", cfg.milestones.album_granularity);
    cfg.milestones.song_granularity =
        env_or_u64("STATS_SONG_GRANULARITY", cfg.milestones.song_granularity);
    cfg.milestones.album_horizon_days =
        env_or_f64("STATS_ALBUM_HORIZON_DAYS", cfg.milestones.album_horizon_days);
    cfg.milestones.song_horizon_days =
        env_or_f64("STATS_SONG_HORIZON_DAYS", cfg.milestones.song_horizon_days);
    cfg.display.timezone = env_or_string("STATS_TIMEZONE", &cfg.display.timezone);
    cfg.display.top_songs = env_or_usize("STATS_TOP_SONGS", cfg.display.top_songs);
}

pub fn load_config(path: &Path) -> Result<StatsConfig> {
    let mut cfg = StatsConfig::default();
    merge_file_config(&mut cfg, path)?;
    apply_env_overrides(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid() {
        let cfg = StatsConfig::default();
        validate(&cfg).expect("defaults validate");
        assert_eq!(cfg.albums.len(), 7);
        assert_eq!(cfg.timezone().expect("tz"), chrono_tz::UTC);
    }

    #[test]
    fn file_sections_replace_defaults() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("stats.toml");
        fs::write(
            &path,
            r#"
[history]
trailing_window = 3
delta_ceiling = 5000

[[albums]]
display = "Positions"
base_name = "Positions"
"#,
        )
        .expect("write config");

        let mut cfg = StatsConfig::default();
        merge_file_config(&mut cfg, &path).expect("merge");
        assert_eq!(cfg.history.trailing_window, 3);
        assert_eq!(cfg.history.implausible_delta_ceiling, 5000);
        assert_eq!(cfg.albums, vec![tracked("Positions", "Positions")]);
        assert_eq!(cfg.cache.snapshot_ttl_secs, 600);
    }

    #[test]
    fn missing_file_keeps_defaults() {
        let tmp = tempdir().expect("tempdir");
        let mut cfg = StatsConfig::default();
        merge_file_config(&mut cfg, &tmp.path().join("absent.toml")).expect("merge");
        assert_eq!(cfg.history.trailing_window, 7);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = StatsConfig::default();
        cfg.milestones.song_granularity = 0;
        assert!(validate(&cfg).is_err());

        let mut cfg = StatsConfig::default();
        cfg.display.timezone = "Mars/Olympus".to_string();
        let err = validate(&cfg).expect_err("bad tz");
        assert!(err.to_string().contains("Mars/Olympus"));

        let mut cfg = StatsConfig::default();
        cfg.history.trailing_window = 0;
        assert!(validate(&cfg).is_err());
    }
}
