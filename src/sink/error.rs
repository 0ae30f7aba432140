use std::path::{Path, PathBuf};

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to encode record: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("write abandoned after {attempts} attempts")]
    Abandoned { attempts: u64 },

    #[error("storage worker failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SinkError {
    pub(crate) fn storage(path: &Path, source: rusqlite::Error) -> Self {
        Self::Storage {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Returns true when the store reported lock contention that a later attempt
/// can get past. Everything else is fatal.
pub fn is_transient(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}
