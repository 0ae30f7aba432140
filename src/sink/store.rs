use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rusqlite::{params, Connection, OpenFlags, TransactionBehavior};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::config::SinkConfig;
use super::error::{is_transient, SinkError};
use super::retry::Backoff;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    result BLOB
)";

const INSERT_RESULT: &str = "INSERT INTO results (result) VALUES (?1)";

/// Append-only sink that stores MessagePack-encoded records in one SQLite file.
///
/// Any number of tasks may call [`ResultSink::write`] on the same sink (or on
/// separate sinks pointing at the same file). Writers are not serialized in
/// process. SQLite's file lock decides who goes next, and every attempt that
/// loses the race is retried with backoff.
///
/// Without a deadline or a cancelled token, a store that stays locked forever
/// makes `write` retry forever. Losing a record is treated as worse than
/// stalling the caller.
#[derive(Debug)]
pub struct ResultSink {
    path: PathBuf,
    config: SinkConfig,
    cancel: CancellationToken,
}

impl ResultSink {
    pub fn new(path: impl Into<PathBuf>, config: SinkConfig) -> Self {
        Self {
            path: path.into(),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Lets callers abandon writes that are stuck retrying.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Makes sure the `results` table exists.
    ///
    /// Skipped entirely when the file is already there, so `Ok` does not
    /// promise a table: another creator may have opened the file without
    /// committing the table yet. [`ResultSink::write`] covers that window by
    /// creating the table inside its own transaction. Racing creators all
    /// succeed: the table is created with `IF NOT EXISTS` and lock contention
    /// is retried until one of them has committed it.
    pub async fn ensure_schema(&self) -> Result<(), SinkError> {
        self.ensure_schema_since(Instant::now()).await
    }

    async fn ensure_schema_since(&self, started: Instant) -> Result<(), SinkError> {
        if self.path.exists() {
            return Ok(());
        }

        let busy_timeout = self.config.busy_timeout;
        self.retry_transient("create schema", started, move |path| {
            create_schema(path, busy_timeout)
        })
        .await?;

        info!(path = %self.path.display(), "result store ready");
        Ok(())
    }

    /// Encodes `record` and appends it as a new row, returning the row id.
    ///
    /// Returns only once the row is committed, or with the first error that
    /// retrying cannot fix.
    pub async fn write<T>(&self, record: &T) -> Result<i64, SinkError>
    where
        T: Serialize + ?Sized,
    {
        // Encode before touching the store so a bad record never leaves a trace
        let payload: Arc<[u8]> = rmp_serde::to_vec_named(record)?.into();

        // One deadline covers both the schema and the insert
        let started = Instant::now();
        self.ensure_schema_since(started).await?;

        let busy_timeout = self.config.busy_timeout;
        let row_id = self
            .retry_transient("insert result", started, move |path| {
                insert_result(path, &payload, busy_timeout)
            })
            .await?;

        debug!(path = %self.path.display(), row_id, "result committed");
        Ok(row_id)
    }

    /// Writes records one after another, stopping at the first fatal error.
    pub async fn write_all<'a, T, I>(&self, records: I) -> Result<Vec<i64>, SinkError>
    where
        I: IntoIterator<Item = &'a T>,
        T: Serialize + 'a,
    {
        let mut row_ids = Vec::new();
        for record in records {
            row_ids.push(self.write(record).await?);
        }
        Ok(row_ids)
    }

    /// Runs `attempt` on the blocking pool until it succeeds or fails with a
    /// non-transient error. Each run opens and drops its own connection. The
    /// deadline is measured from `started`.
    async fn retry_transient<F, R>(
        &self,
        op: &'static str,
        started: Instant,
        attempt: F,
    ) -> Result<R, SinkError>
    where
        F: Fn(&Path) -> rusqlite::Result<R> + Clone + Send + 'static,
        R: Send + 'static,
    {
        let mut backoff = Backoff::new(self.config.retry_delay, self.config.max_retry_delay);

        loop {
            let path = self.path.clone();
            let attempt = attempt.clone();

            match tokio::task::spawn_blocking(move || attempt(&path)).await? {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) => {
                    let delay = backoff.next_delay();
                    debug!(
                        path = %self.path.display(),
                        op,
                        attempts = backoff.attempts(),
                        ?delay,
                        error = %err,
                        "store busy, retrying"
                    );
                    self.pause(delay, started, backoff.attempts()).await?;
                }
                Err(err) => return Err(SinkError::storage(&self.path, err)),
            }
        }
    }

    async fn pause(&self, delay: Duration, started: Instant, attempts: u64) -> Result<(), SinkError> {
        if let Some(deadline) = self.config.deadline {
            if started.elapsed() + delay > deadline {
                return Err(SinkError::Abandoned { attempts });
            }
        }

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(SinkError::Abandoned { attempts }),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

fn open(path: &Path, busy_timeout: Duration) -> rusqlite::Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)?;
    conn.busy_timeout(busy_timeout)?;
    Ok(conn)
}

fn create_schema(path: &Path, busy_timeout: Duration) -> rusqlite::Result<()> {
    let mut conn = open(path, busy_timeout)?;
    let tx = conn.transaction()?;
    tx.execute_batch(CREATE_TABLE)?;
    tx.commit()
}

/// One insert+commit unit. A failure anywhere rolls the transaction back when
/// `tx` drops, so the next attempt starts clean.
fn insert_result(path: &Path, payload: &[u8], busy_timeout: Duration) -> rusqlite::Result<i64> {
    let mut conn = open(path, busy_timeout)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    // The file can exist before its creator has committed the table
    tx.execute_batch(CREATE_TABLE)?;
    tx.execute(INSERT_RESULT, params![payload])?;
    let row_id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(row_id)
}
