use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
    #[error("snapshot file malformed: {path}: {reason}")]
    MalformedSnapshot { path: String, reason: String },
    #[error("snapshot table {path} has no `{column}` column")]
    MissingIdentityColumn { path: String, column: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadIssueCode {
    E001NoDataDir,
    E002NoSnapshots,
    E003LatestLoadFailed,
}

impl LoadIssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001NoDataDir => "E001_NO_DATA_DIR",
            Self::E002NoSnapshots => "E002_NO_SNAPSHOTS",
            Self::E003LatestLoadFailed => "E003_LATEST_LOAD_FAILED",
        }
    }
}
