//! Canonical column resolution for per-day export tables.
//!
//! Exports have drifted over time (`Daily_Raw`, `Daily Raw`, `Daily`, ...).
//! Downstream code only ever reads the canonical integer columns produced
//! here, so adding a new export format means adding a resolver candidate.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableKind {
    Songs,
    Albums,
}

impl TableKind {
    pub fn file_suffix(self) -> &'static str {
        match self {
            Self::Songs => "_songs.csv",
            Self::Albums => "_albums.csv",
        }
    }

    pub fn identity_column(self) -> &'static str {
        match self {
            Self::Songs => "Song",
            Self::Albums => "Base_Name",
        }
    }

    fn canonical_columns(self) -> &'static [CanonicalColumn] {
        match self {
            Self::Songs => &[CanonicalColumn::DailyNum, CanonicalColumn::StreamsNum],
            Self::Albums => &[CanonicalColumn::DailyNum, CanonicalColumn::TotalNum],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalColumn {
    DailyNum,
    TotalNum,
    StreamsNum,
}

impl CanonicalColumn {
    pub fn name(self) -> &'static str {
        match self {
            Self::DailyNum => "Daily_Num",
            Self::TotalNum => "Total_Num",
            Self::StreamsNum => "Streams_Num",
        }
    }

    /// Source columns tried in priority order. The first entry is the
    /// canonical name itself, for exports that already carry it.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            Self::DailyNum => &["Daily_Num", "Daily_Raw", "Daily Raw", "Daily"],
            Self::TotalNum => &["Total_Num", "Total", "Streams"],
            Self::StreamsNum => &["Streams_Num", "Streams"],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: BTreeMap<String, String>,
    pub canonical: BTreeMap<CanonicalColumn, u64>,
}

impl TableRow {
    pub fn cell(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    pub fn value(&self, column: CanonicalColumn) -> u64 {
        self.canonical.get(&column).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotTable {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
    canonical_columns: Vec<CanonicalColumn>,
}

impl SnapshotTable {
    pub fn new(headers: Vec<String>, rows: Vec<BTreeMap<String, String>>) -> Self {
        Self {
            headers,
            rows: rows
                .into_iter()
                .map(|cells| TableRow {
                    cells,
                    canonical: BTreeMap::new(),
                })
                .collect(),
            canonical_columns: Vec::new(),
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    pub fn has_canonical(&self, column: CanonicalColumn) -> bool {
        self.canonical_columns.contains(&column)
    }

    /// Rewrites `column` in every row through `f`.
    pub fn map_column(&mut self, column: &str, f: impl Fn(&str) -> String) {
        for row in &mut self.rows {
            if let Some(cell) = row.cells.get_mut(column) {
                *cell = f(cell);
            }
        }
    }
}

/// Parse a noisy numeric cell: drop `,` and `+`, keep the integer part,
/// fall back to 0 for anything that still does not parse.
pub fn parse_or_zero(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else {
        return 0;
    };
    let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '+').collect();
    let integer_part = cleaned.split('.').next().unwrap_or_default().trim();
    integer_part.parse::<u64>().unwrap_or(0)
}

/// Song names arrive with mojibake apostrophes, trademark debris and
/// chart markers; strip those so names join across days.
pub fn clean_name(raw: &str) -> String {
    raw.replace("â€™", "'")
        .replace('\u{2019}', "'")
        .replace("â„¢", "")
        .replace('*', "")
        .trim()
        .to_string()
}

fn resolve_source(table: &SnapshotTable, column: CanonicalColumn) -> Option<&'static str> {
    column
        .candidates()
        .iter()
        .copied()
        .find(|candidate| table.has_column(candidate))
}

pub fn normalize(table: &mut SnapshotTable, kind: TableKind) {
    for &column in kind.canonical_columns() {
        if table.has_canonical(column) {
            continue;
        }
        let source = resolve_source(table, column);
        for row in &mut table.rows {
            let value = source.map_or(0, |name| parse_or_zero(row.cell(name)));
            row.canonical.insert(column, value);
        }
        table.canonical_columns.push(column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> SnapshotTable {
        let headers = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
        let rows = rows
            .iter()
            .map(|cells| {
                headers
                    .iter()
                    .cloned()
                    .zip(cells.iter().map(|c| c.to_string()))
                    .collect::<BTreeMap<_, _>>()
            })
            .collect();
        SnapshotTable::new(headers, rows)
    }

    #[test]
    fn parse_or_zero_handles_noisy_cells() {
        assert_eq!(parse_or_zero(Some("1,234")), 1234);
        assert_eq!(parse_or_zero(Some("+500")), 500);
        assert_eq!(parse_or_zero(Some("12.7")), 12);
        assert_eq!(parse_or_zero(Some("abc")), 0);
        assert_eq!(parse_or_zero(Some("")), 0);
        assert_eq!(parse_or_zero(None), 0);
        assert_eq!(parse_or_zero(Some("-42")), 0);
    }

    #[test]
    fn clean_name_strips_export_debris() {
        assert_eq!(clean_name("we canâ€™t be friends*"), "we can't be friends");
        assert_eq!(clean_name("  yes, and?\u{2019} "), "yes, and?'");
        assert_eq!(clean_name("7 ringsâ„¢"), "7 rings");
    }

    #[test]
    fn daily_column_follows_priority_order() {
        let mut t = table(
            &["Song", "Daily", "Daily Raw", "Streams"],
            &[&["a", "1", "2,000", "10"]],
        );
        normalize(&mut t, TableKind::Songs);
        assert_eq!(t.rows[0].value(CanonicalColumn::DailyNum), 2000);
        assert_eq!(t.rows[0].value(CanonicalColumn::StreamsNum), 10);
    }

    #[test]
    fn album_total_falls_back_to_streams_then_zero() {
        let mut with_streams = table(&["Base_Name", "Daily", "Streams"], &[&["x", "5", "99"]]);
        normalize(&mut with_streams, TableKind::Albums);
        assert_eq!(with_streams.rows[0].value(CanonicalColumn::TotalNum), 99);

        let mut bare = table(&["Base_Name"], &[&["x"]]);
        normalize(&mut bare, TableKind::Albums);
        assert_eq!(bare.rows[0].value(CanonicalColumn::DailyNum), 0);
        assert_eq!(bare.rows[0].value(CanonicalColumn::TotalNum), 0);
        assert!(!bare.has_canonical(CanonicalColumn::StreamsNum));
    }

    #[test]
    fn normalize_is_idempotent_for_both_kinds() {
        for kind in [TableKind::Songs, TableKind::Albums] {
            let mut once = table(
                &["Song", "Base_Name", "Daily_Raw", "Total", "Streams"],
                &[&["a", "a", "+1,000", "7.9", "3"], &["b", "b", "n/a", "", "4"]],
            );
            normalize(&mut once, kind);
            let mut twice = once.clone();
            normalize(&mut twice, kind);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn empty_table_gains_canonical_columns() {
        let mut t = table(&["Song", "Daily"], &[]);
        normalize(&mut t, TableKind::Songs);
        assert!(t.rows.is_empty());
        assert_eq!(
            t.canonical_columns,
            vec![CanonicalColumn::DailyNum, CanonicalColumn::StreamsNum]
        );
    }
}
