use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("failed to open tracker database at {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("tracker migration failed: {0}")]
    Migration(#[from] rusqlite::Error),

    #[error("tracker query failed: {0}")]
    Query(String),

    #[error("tracker task failed: {0}")]
    Spawn(#[from] tokio::task::JoinError),

    #[error("tracker schema version {found} is newer than supported version {expected}")]
    UnsupportedSchemaVersion { found: i32, expected: i32 },
}

impl TrackerError {
    pub fn query(source: rusqlite::Error) -> Self {
        TrackerError::Query(source.to_string())
    }
}
