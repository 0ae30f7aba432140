use std::time::Duration;

/// Retry and locking knobs for a [`super::ResultSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// First wait after a transient lock error.
    pub retry_delay: Duration,
    /// Ceiling for the doubling backoff.
    pub max_retry_delay: Duration,
    /// How long the driver itself waits on a locked file before reporting busy.
    pub busy_timeout: Duration,
    /// Upper bound on the time one call may spend retrying. `None` retries
    /// until the write lands, so a permanently locked store stalls the caller.
    pub deadline: Option<Duration>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(2),
            max_retry_delay: Duration::from_millis(100),
            busy_timeout: Duration::from_millis(50),
            deadline: None,
        }
    }
}
