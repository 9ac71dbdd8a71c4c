use crate::error::StatsError;
use crate::stats::metadata::{MetaRecord, read_meta};
use crate::stats::normalize::{CanonicalColumn, SnapshotTable, TableKind, clean_name, normalize};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const META_SUFFIX: &str = "_meta.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedFile {
    pub date: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongRow {
    pub name: String,
    pub daily_num: u64,
    pub streams_num: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumRow {
    pub base_name: String,
    pub daily_num: u64,
    pub total_num: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub date: String,
    pub songs: Vec<SongRow>,
    pub albums: Option<Vec<AlbumRow>>,
    pub meta: MetaRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatestPair {
    pub today: Snapshot,
    pub previous: Option<Snapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LatestLoad {
    NoData,
    Loaded(Box<LatestPair>),
    Failed { date: String, reason: String },
}

/// Date token of a dated export: everything before the first `_`.
pub fn date_key(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let (date, _) = name.split_once('_')?;
    if date.is_empty() {
        return None;
    }
    Some(date.to_string())
}

/// Lists `*<suffix>` files in `dir`, oldest first. Date tokens sort
/// lexicographically in chronological order.
pub fn discover(dir: &Path, suffix: &str) -> Result<Vec<DatedFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let read_dir =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    let mut out = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if !name.ends_with(suffix) {
            continue;
        }
        let Some(date) = date_key(&path) else {
            continue;
        };
        out.push(DatedFile { date, path });
    }

    out.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(out)
}

pub fn sibling_path(dir: &Path, date: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{date}{suffix}"))
}

fn malformed(path: &Path, err: impl std::fmt::Display) -> StatsError {
    StatsError::MalformedSnapshot {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Reads one export table, validates its identity column and adds the
/// canonical integer columns.
pub fn read_table(path: &Path, kind: TableKind) -> Result<SnapshotTable> {
    // Short rows keep their leading cells; the rest resolve to 0.
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|err| malformed(path, err))?;

    let headers = rdr
        .headers()
        .map_err(|err| malformed(path, err))?
        .iter()
        .map(ToOwned::to_owned)
        .collect::<Vec<_>>();

    let identity = kind.identity_column();
    if !headers.iter().any(|h| h == identity) {
        return Err(StatsError::MissingIdentityColumn {
            path: path.display().to_string(),
            column: identity,
        }
        .into());
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|err| malformed(path, err))?;
        let cells = headers
            .iter()
            .cloned()
            .zip(record.iter().map(ToOwned::to_owned))
            .collect::<BTreeMap<_, _>>();
        rows.push(cells);
    }

    let mut table = SnapshotTable::new(headers, rows);
    if kind == TableKind::Songs {
        table.map_column(identity, clean_name);
    }
    normalize(&mut table, kind);
    Ok(table)
}

pub fn song_rows(table: &SnapshotTable) -> Vec<SongRow> {
    table
        .rows
        .iter()
        .map(|row| SongRow {
            name: row.cell("Song").unwrap_or_default().to_string(),
            daily_num: row.value(CanonicalColumn::DailyNum),
            streams_num: row.value(CanonicalColumn::StreamsNum),
        })
        .collect()
}

pub fn album_rows(table: &SnapshotTable) -> Vec<AlbumRow> {
    table
        .rows
        .iter()
        .map(|row| AlbumRow {
            base_name: row.cell("Base_Name").unwrap_or_default().to_string(),
            daily_num: row.value(CanonicalColumn::DailyNum),
            total_num: row.value(CanonicalColumn::TotalNum),
        })
        .collect()
}

/// Loads the complete file set for `date`. The album table is optional;
/// the song table and metadata record are not.
pub fn load_day(dir: &Path, date: &str) -> Result<Snapshot> {
    let songs_path = sibling_path(dir, date, TableKind::Songs.file_suffix());
    let meta_path = sibling_path(dir, date, META_SUFFIX);
    let albums_path = sibling_path(dir, date, TableKind::Albums.file_suffix());

    let songs = song_rows(&read_table(&songs_path, TableKind::Songs)?);
    let meta = read_meta(&meta_path)?;
    let albums = if albums_path.exists() {
        Some(album_rows(&read_table(&albums_path, TableKind::Albums)?))
    } else {
        None
    };

    Ok(Snapshot {
        date: date.to_string(),
        songs,
        albums,
        meta,
    })
}

pub fn load_latest_pair(dir: &Path) -> LatestLoad {
    let song_files = match discover(dir, TableKind::Songs.file_suffix()) {
        Ok(files) => files,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "snapshot discovery failed");
            return LatestLoad::NoData;
        }
    };

    let Some(latest) = song_files.last() else {
        debug!(dir = %dir.display(), "no song snapshots yet");
        return LatestLoad::NoData;
    };

    let today = match load_day(dir, &latest.date) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(date = %latest.date, error = %format!("{err:#}"), "latest snapshot failed to load");
            return LatestLoad::Failed {
                date: latest.date.clone(),
                reason: format!("{err:#}"),
            };
        }
    };

    let previous = song_files
        .len()
        .checked_sub(2)
        .and_then(|idx| song_files.get(idx))
        .and_then(|prev| match load_day(dir, &prev.date) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                debug!(date = %prev.date, error = %format!("{err:#}"), "previous snapshot skipped");
                None
            }
        });

    info!(
        date = %today.date,
        songs = today.songs.len(),
        has_previous = previous.is_some(),
        "loaded latest snapshot"
    );
    LatestLoad::Loaded(Box::new(LatestPair { today, previous }))
}
