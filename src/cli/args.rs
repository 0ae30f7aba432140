use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::collect::ReadOptions;
use crate::sink::SinkConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "result-sink")]
#[command(about = "Collect JSON records into a single SQLite results file")]
#[command(version)]
#[allow(clippy::struct_excessive_bools)] // CLI args naturally have many boolean flags
pub struct Args {
    /// Record files or directories to read (`-` or nothing reads stdin)
    pub inputs: Vec<PathBuf>,

    /// Results store to append to
    #[arg(short = 'o', long, default_value = "results.db")]
    pub output: PathBuf,

    /// Concurrent writers (default: number of CPUs)
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Records handed to a writer at a time
    #[arg(short = 'b', long, default_value_t = 50)]
    pub batch_size: usize,

    /// Record field used to group the summary
    #[arg(short = 'k', long, default_value = "type")]
    pub category_key: String,

    /// File extensions picked up when walking directories (comma-separated)
    #[arg(
        short = 'e',
        long,
        value_delimiter = ',',
        default_value = "json,jsonl,ndjson"
    )]
    pub extensions: Vec<String>,

    /// First wait after the store reports it is locked
    #[arg(long, default_value_t = 2)]
    pub retry_delay_ms: u64,

    /// Longest wait between retries on a locked store
    #[arg(long, default_value_t = 100)]
    pub max_retry_delay_ms: u64,

    /// How long SQLite itself waits on a lock before giving the write back
    #[arg(long, default_value_t = 50)]
    pub busy_timeout_ms: u64,

    /// Give up on a record still locked out after this many seconds (default: never)
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Print the summary as a single JSON object
    #[arg(long, conflicts_with = "quiet")]
    pub json: bool,

    /// Print no summary
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Follow symbolic links (default: false for safety)
    #[arg(long)]
    pub follow_links: bool,

    /// Respect .gitignore files (default: false - read everything)
    #[arg(long)]
    pub respect_ignore: bool,
}

impl Args {
    pub fn effective_inputs(&self) -> Vec<PathBuf> {
        if self.inputs.is_empty() {
            vec![PathBuf::from("-")]
        } else {
            self.inputs.clone()
        }
    }

    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_retry_delay: Duration::from_millis(self.max_retry_delay_ms),
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            deadline: self.deadline_secs.map(Duration::from_secs),
        }
    }

    pub fn read_options(&self, batch_size: NonZeroUsize) -> ReadOptions {
        ReadOptions {
            inputs: self.effective_inputs(),
            extensions: self.extensions.clone(),
            batch_size,
            follow_links: self.follow_links,
            respect_ignore: self.respect_ignore,
        }
    }
}
