//! Concurrent, append-only result collection into a single SQLite file.
//!
//! [`sink::ResultSink`] is the store every producer writes through,
//! [`chunk`] batches records for it, [`collect`] drives producers from JSON
//! inputs, and [`summary`] reports what was written.

pub mod chunk;
pub mod cli;
pub mod collect;
pub mod logging;
pub mod sink;
pub mod summary;
