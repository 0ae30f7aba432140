use std::fs::File;
use std::io::{self, BufReader, Read};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::chunk::ChunkIter;

/// Batches waiting for a producer. Keeps the reader from racing ahead of the store.
const READ_QUEUE: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    pub source: String,
    pub records: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadEvent {
    Batch(RecordBatch),
    /// The source was abandoned at its first unreadable value
    Malformed { source: String, error: String },
}

#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub inputs: Vec<PathBuf>,
    pub extensions: Vec<String>,
    pub batch_size: NonZeroUsize,
    pub follow_links: bool,
    pub respect_ignore: bool,
}

/// Streams JSON records out of every input, `batch_size` records at a time.
///
/// Files are read one after another on the blocking pool. The receiver sees
/// batches from a file in file order; the channel closes once all inputs are
/// exhausted or the token is cancelled.
pub fn start_read(options: ReadOptions, cancel_token: CancellationToken) -> mpsc::Receiver<ReadEvent> {
    let (tx, rx) = mpsc::channel(READ_QUEUE);

    tokio::task::spawn_blocking(move || {
        for input in &options.inputs {
            if cancel_token.is_cancelled() {
                return;
            }

            if is_stdin(input) {
                let stdin = io::stdin().lock();
                if !read_source("stdin", stdin, options.batch_size, &tx, &cancel_token) {
                    return;
                }
                continue;
            }

            for path in discover(input, &options) {
                let source = source_name(&path);
                let keep_going = match File::open(&path) {
                    Ok(file) => read_source(&source, file, options.batch_size, &tx, &cancel_token),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "cannot open input");
                        tx.blocking_send(ReadEvent::Malformed {
                            source,
                            error: e.to_string(),
                        })
                        .is_ok()
                    }
                };
                if !keep_going {
                    return;
                }
            }
        }
    });

    rx
}

fn is_stdin(input: &Path) -> bool {
    input.as_os_str() == "-"
}

/// Expands one input into the record files it names. A plain file is taken as
/// is; a directory is walked for files with a matching extension.
pub fn discover(input: &Path, options: &ReadOptions) -> Vec<PathBuf> {
    if !input.is_dir() {
        return vec![input.to_path_buf()];
    }

    WalkBuilder::new(input)
        .hidden(false)
        .follow_links(options.follow_links) // off unless asked for
        .git_ignore(options.respect_ignore)
        .git_global(false)
        .git_exclude(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| has_extension(path, &options.extensions))
        .collect()
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
}

fn source_name(path: &Path) -> String {
    path.file_stem().map_or_else(
        || path.display().to_string(),
        |stem| stem.to_string_lossy().to_string(),
    )
}

/// Sends every JSON value in `reader` as batches. Returns false when the
/// receiver is gone or the token was cancelled.
fn read_source<R: Read>(
    source: &str,
    reader: R,
    batch_size: NonZeroUsize,
    tx: &mpsc::Sender<ReadEvent>,
    cancel_token: &CancellationToken,
) -> bool {
    let mut failure = None;
    let values = serde_json::Deserializer::from_reader(BufReader::new(reader))
        .into_iter::<Value>()
        .map_while(|value| value.map_err(|e| failure = Some(e)).ok());

    for records in ChunkIter::new(values, batch_size) {
        if cancel_token.is_cancelled() {
            return false;
        }
        let batch = RecordBatch {
            source: source.to_string(),
            records,
        };
        if tx.blocking_send(ReadEvent::Batch(batch)).is_err() {
            return false;
        }
    }

    if let Some(e) = failure {
        warn!(source, error = %e, "malformed input, skipping the rest of it");
        return tx
            .blocking_send(ReadEvent::Malformed {
                source: source.to_string(),
                error: e.to_string(),
            })
            .is_ok();
    }

    true
}
