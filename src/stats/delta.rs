use crate::stats::snapshot::{AlbumRow, SongRow};
use serde::Serialize;
use std::collections::BTreeMap;

pub const ZERO_SHARE: &str = "0%";

/// Something keyed by identity that carries a daily increment.
pub trait DailyEntity {
    fn key(&self) -> &str;
    fn daily(&self) -> u64;
}

impl DailyEntity for SongRow {
    fn key(&self) -> &str {
        &self.name
    }

    fn daily(&self) -> u64 {
        self.daily_num
    }
}

impl DailyEntity for AlbumRow {
    fn key(&self) -> &str {
        &self.base_name
    }

    fn daily(&self) -> u64 {
        self.daily_num
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delta<T> {
    #[serde(flatten)]
    pub row: T,
    pub previous_daily_num: u64,
    pub change: i64,
    pub share: String,
}

pub type SongDelta = Delta<SongRow>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumDelta {
    #[serde(flatten)]
    pub delta: Delta<AlbumRow>,
    pub total_share: String,
}

/// `value / denominator` as a percentage with two decimals.
pub fn share_percent(value: u64, denominator: u64) -> String {
    if denominator == 0 {
        return ZERO_SHARE.to_string();
    }
    format!("{:.2}%", value as f64 / denominator as f64 * 100.0)
}

/// `current - previous`, clamped to the `i64` range.
pub fn signed_change(current: u64, previous: u64) -> i64 {
    if current >= previous {
        i64::try_from(current - previous).unwrap_or(i64::MAX)
    } else {
        i64::try_from(previous - current).map_or(i64::MIN, |d| -d)
    }
}

/// Saturates instead of wrapping on corrupt exports.
pub fn summed_daily<T: DailyEntity>(rows: &[T]) -> u64 {
    rows.iter()
        .map(DailyEntity::daily)
        .fold(0u64, u64::saturating_add)
}

/// Left join of `current` onto `previous`. Without a previous table every
/// change is 0; entities new today diff against 0.
pub fn compute_deltas<T>(current: &[T], previous: Option<&[T]>, denominator: u64) -> Vec<Delta<T>>
where
    T: DailyEntity + Clone,
{
    let previous_by_key = previous.map(|rows| {
        let mut map = BTreeMap::new();
        for row in rows {
            map.entry(row.key()).or_insert_with(|| row.daily());
        }
        map
    });

    current
        .iter()
        .map(|row| {
            let (previous_daily_num, change) = match &previous_by_key {
                Some(map) => {
                    let prev = map.get(row.key()).copied().unwrap_or(0);
                    (prev, signed_change(row.daily(), prev))
                }
                None => (0, 0),
            };
            Delta {
                row: row.clone(),
                previous_daily_num,
                change,
                share: share_percent(row.daily(), denominator),
            }
        })
        .collect()
}

pub fn compute_album_deltas(
    current: &[AlbumRow],
    previous: Option<&[AlbumRow]>,
    daily_denominator: u64,
    career_total: u64,
) -> Vec<AlbumDelta> {
    compute_deltas(current, previous, daily_denominator)
        .into_iter()
        .map(|delta| {
            let total_share = share_percent(delta.row.total_num, career_total);
            AlbumDelta { delta, total_share }
        })
        .collect()
}

pub fn sort_by_daily_desc<T: DailyEntity>(rows: &mut [Delta<T>]) {
    rows.sort_by(|a, b| b.row.daily().cmp(&a.row.daily()));
}

pub fn count_at_or_above(songs: &[SongRow], threshold: u64) -> usize {
    songs.iter().filter(|s| s.streams_num >= threshold).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(name: &str, daily: u64) -> SongRow {
        SongRow {
            name: name.to_string(),
            daily_num: daily,
            streams_num: daily * 100,
        }
    }

    fn parse_share(share: &str) -> f64 {
        share.trim_end_matches('%').parse().expect("share parses")
    }

    #[test]
    fn shares_sum_to_roughly_one_hundred() {
        let songs = vec![song("a", 333), song("b", 333), song("c", 334), song("d", 7)];
        let total = summed_daily(&songs);
        let deltas = compute_deltas(&songs, None, total);
        let sum: f64 = deltas.iter().map(|d| parse_share(&d.share)).sum();
        assert!((sum - 100.0).abs() <= 0.1, "sum was {sum}");
    }

    #[test]
    fn zero_denominator_yields_zero_share_literal() {
        let songs = vec![song("a", 0)];
        let deltas = compute_deltas(&songs, None, 0);
        assert_eq!(deltas[0].share, "0%");
    }

    #[test]
    fn no_previous_table_means_zero_change() {
        let songs = vec![song("a", 10), song("b", 30)];
        let deltas = compute_deltas(&songs, None, 40);
        assert!(deltas.iter().all(|d| d.change == 0));
        assert_eq!(deltas[0].share, "25.00%");
        assert_eq!(deltas[1].share, "75.00%");
    }

    #[test]
    fn change_is_left_join_with_zero_default() {
        let today = vec![song("a", 10), song("new", 5)];
        let yesterday = vec![song("a", 25), song("gone", 99)];
        let deltas = compute_deltas(&today, Some(yesterday.as_slice()), 15);
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].change, -15);
        assert_eq!(deltas[0].previous_daily_num, 25);
        assert_eq!(deltas[1].change, 5);
        assert_eq!(deltas[1].previous_daily_num, 0);
    }

    #[test]
    fn album_total_share_uses_career_total() {
        let albums = vec![AlbumRow {
            base_name: "Positions".into(),
            daily_num: 50,
            total_num: 250,
        }];
        let deltas = compute_album_deltas(&albums, None, 200, 1000);
        assert_eq!(deltas[0].delta.share, "25.00%");
        assert_eq!(deltas[0].total_share, "25.00%");

        let no_career = compute_album_deltas(&albums, None, 200, 0);
        assert_eq!(no_career[0].total_share, "0%");
    }

    #[test]
    fn milestone_counts_are_inclusive() {
        let songs = vec![
            SongRow {
                name: "a".into(),
                daily_num: 0,
                streams_num: 1_000_000_000,
            },
            SongRow {
                name: "b".into(),
                daily_num: 0,
                streams_num: 999_999_999,
            },
        ];
        assert_eq!(count_at_or_above(&songs, 1_000_000_000), 1);
        assert_eq!(count_at_or_above(&songs, 100_000_000), 2);
    }

    #[test]
    fn huge_daily_values_saturate_instead_of_overflowing() {
        let huge = |name: &str| SongRow {
            name: name.to_string(),
            daily_num: 10_000_000_000_000_000_000,
            streams_num: 1,
        };
        let today = vec![huge("a"), huge("b")];
        assert_eq!(summed_daily(&today), u64::MAX);

        let yesterday = vec![SongRow {
            daily_num: 0,
            ..huge("a")
        }];
        let deltas = compute_deltas(&today, Some(yesterday.as_slice()), summed_daily(&today));
        assert_eq!(deltas[0].change, i64::MAX);
    }

    #[test]
    fn signed_change_clamps_both_directions() {
        assert_eq!(signed_change(7, 10), -3);
        assert_eq!(signed_change(u64::MAX, 0), i64::MAX);
        assert_eq!(signed_change(0, u64::MAX), i64::MIN);
        assert_eq!(signed_change(0, 1 << 63), i64::MIN);
    }
}
