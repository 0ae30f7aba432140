mod chunker;

pub use chunker::{check_size, chunk_iter, chunk_map, chunk_slice, ChunkError, ChunkIter, MapChunks};
