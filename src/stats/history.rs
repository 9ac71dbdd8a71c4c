use crate::stats::delta::signed_change;
use crate::stats::metadata::read_meta;
use crate::stats::normalize::{CanonicalColumn, TableKind};
use crate::stats::snapshot::{META_SUFFIX, discover, read_table};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Career-total jumps at or above this are export corruption, not streams.
pub const DEFAULT_IMPLAUSIBLE_DELTA: u64 = 100_000_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: String,
    pub value: u64,
}

pub fn career_daily_history(dir: &Path, ceiling: u64) -> Result<Vec<SeriesPoint>> {
    let files = discover(dir, META_SUFFIX)?;
    if files.len() < 2 {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for pair in files.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let totals = read_meta(&prev.path).and_then(|p| Ok((p, read_meta(&curr.path)?)));
        let (prev_meta, curr_meta) = match totals {
            Ok(v) => v,
            Err(err) => {
                debug!(date = %curr.date, error = %format!("{err:#}"), "career history point skipped");
                continue;
            }
        };
        let Some(delta) = curr_meta.career_total.checked_sub(prev_meta.career_total) else {
            continue;
        };
        if delta > 0 && delta < ceiling {
            out.push(SeriesPoint {
                date: curr.date.clone(),
                value: delta,
            });
        }
    }
    Ok(out)
}

/// Daily series of one song (by cleaned name) or album (by base name).
pub fn item_history(dir: &Path, kind: TableKind, name: &str) -> Result<Vec<SeriesPoint>> {
    let identity = kind.identity_column();
    let mut out = Vec::new();
    for file in discover(dir, kind.file_suffix())? {
        let table = match read_table(&file.path, kind) {
            Ok(t) => t,
            Err(err) => {
                debug!(date = %file.date, error = %format!("{err:#}"), "item history file skipped");
                continue;
            }
        };
        if let Some(row) = table.rows.iter().find(|r| r.cell(identity) == Some(name)) {
            out.push(SeriesPoint {
                date: file.date.clone(),
                value: row.value(CanonicalColumn::DailyNum),
            });
        }
    }
    Ok(out)
}

pub fn listeners_history(dir: &Path) -> Result<Vec<SeriesPoint>> {
    let mut out = Vec::new();
    for file in discover(dir, META_SUFFIX)? {
        let Ok(meta) = read_meta(&file.path) else {
            debug!(date = %file.date, "listener history file skipped");
            continue;
        };
        let count = meta.listener_count();
        if count > 0 {
            out.push(SeriesPoint {
                date: file.date,
                value: count,
            });
        }
    }
    Ok(out)
}

/// Latest listener count minus the one before it; 0 without two points.
pub fn listeners_change(series: &[SeriesPoint]) -> i64 {
    match series {
        [.., prev, curr] => signed_change(curr.value, prev.value),
        _ => 0,
    }
}

/// Mean daily increment per song over the last `window` song files. A
/// song only contributes on the days it appears.
pub fn song_trailing_averages(dir: &Path, window: usize) -> Result<BTreeMap<String, f64>> {
    let files = discover(dir, TableKind::Songs.file_suffix())?;
    let recent = &files[files.len().saturating_sub(window)..];
    if recent.len() < 2 {
        return Ok(BTreeMap::new());
    }

    let mut sums: BTreeMap<String, (f64, u32)> = BTreeMap::new();
    for file in recent {
        let table = match read_table(&file.path, TableKind::Songs) {
            Ok(t) => t,
            Err(err) => {
                debug!(date = %file.date, error = %format!("{err:#}"), "trailing average file skipped");
                continue;
            }
        };
        for row in &table.rows {
            let name = row.cell("Song").unwrap_or_default().to_string();
            let entry = sums.entry(name).or_insert((0.0, 0));
            entry.0 += row.value(CanonicalColumn::DailyNum) as f64;
            entry.1 += 1;
        }
    }

    Ok(sums
        .into_iter()
        .map(|(name, (sum, n))| (name, sum / f64::from(n)))
        .collect())
}

/// Mean of one entity's strictly positive daily values over the last
/// `window` files of its kind; 0.0 when there are none.
pub fn entity_trailing_average(
    dir: &Path,
    kind: TableKind,
    name: &str,
    window: usize,
) -> Result<f64> {
    let files = discover(dir, kind.file_suffix())?;
    let recent = &files[files.len().saturating_sub(window)..];
    let identity = kind.identity_column();

    let mut dailies = Vec::new();
    for file in recent {
        let Ok(table) = read_table(&file.path, kind) else {
            continue;
        };
        let Some(row) = table.rows.iter().find(|r| r.cell(identity) == Some(name)) else {
            continue;
        };
        let daily = row.value(CanonicalColumn::DailyNum);
        if daily > 0 {
            dailies.push(daily as f64);
        }
    }

    if dailies.is_empty() {
        return Ok(0.0);
    }
    Ok(dailies.iter().sum::<f64>() / dailies.len() as f64)
}

/// Mean of a series' values; `None` for an empty series.
pub fn series_mean(series: &[SeriesPoint]) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    Some(series.iter().map(|p| p.value as f64).sum::<f64>() / series.len() as f64)
}
