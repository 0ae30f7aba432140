mod pipeline;
mod reader;

pub use pipeline::{collect, run};
pub use reader::{discover, start_read, ReadEvent, ReadOptions, RecordBatch};
