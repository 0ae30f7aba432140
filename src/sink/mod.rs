mod config;
mod error;
mod retry;
mod store;

pub use config::SinkConfig;
pub use error::{is_transient, SinkError};
pub use store::ResultSink;
