//! Bounded-size batching over slices, iterators and insertion-ordered maps.
//!
//! Every entry point validates `size` up front and then hands back a lazy,
//! single-pass iterator. Chunks borrow from the source, so the source cannot
//! change while chunks are still being produced.

use std::hash::Hash;
use std::num::NonZeroUsize;

use indexmap::IndexMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk size must be positive, got {0}")]
    InvalidSize(usize),
}

/// Rejects a zero chunk size.
pub fn check_size(size: usize) -> Result<NonZeroUsize, ChunkError> {
    NonZeroUsize::new(size).ok_or(ChunkError::InvalidSize(size))
}

/// Splits `data` into contiguous subslices of at most `size` elements.
pub fn chunk_slice<T>(data: &[T], size: usize) -> Result<std::slice::Chunks<'_, T>, ChunkError> {
    let size = check_size(size)?;
    Ok(data.chunks(size.get()))
}

/// Groups any iterator into `Vec`s of at most `size` items, pulling from the
/// source only when the next chunk is requested.
pub fn chunk_iter<I>(iter: I, size: usize) -> Result<ChunkIter<I::IntoIter>, ChunkError>
where
    I: IntoIterator,
{
    Ok(ChunkIter::new(iter.into_iter(), check_size(size)?))
}

/// Splits a map into sub-maps of at most `size` entries, keeping the map's
/// insertion order. Keys and values are borrowed from `data`.
pub fn chunk_map<K, V>(data: &IndexMap<K, V>, size: usize) -> Result<MapChunks<'_, K, V>, ChunkError>
where
    K: Hash + Eq,
{
    Ok(MapChunks {
        inner: chunk_iter(data.iter(), size)?,
    })
}

#[derive(Debug, Clone)]
pub struct ChunkIter<I> {
    iter: I,
    size: NonZeroUsize,
}

impl<I: Iterator> ChunkIter<I> {
    /// For callers that already hold a validated size.
    pub const fn new(iter: I, size: NonZeroUsize) -> Self {
        Self { iter, size }
    }
}

impl<I: Iterator> Iterator for ChunkIter<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chunk = Vec::with_capacity(self.size.get().min(self.iter.size_hint().0.max(1)));
        chunk.extend(self.iter.by_ref().take(self.size.get()));
        if chunk.is_empty() {
            None
        } else {
            Some(chunk)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = self.iter.size_hint();
        let size = self.size.get();
        (lower.div_ceil(size), upper.map(|n| n.div_ceil(size)))
    }
}

impl<I: ExactSizeIterator> ExactSizeIterator for ChunkIter<I> {}

#[derive(Debug, Clone)]
pub struct MapChunks<'a, K, V> {
    inner: ChunkIter<indexmap::map::Iter<'a, K, V>>,
}

impl<'a, K, V> Iterator for MapChunks<'a, K, V>
where
    K: Hash + Eq,
{
    type Item = IndexMap<&'a K, &'a V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|pairs| pairs.into_iter().collect())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Hash + Eq, V> ExactSizeIterator for MapChunks<'_, K, V> {}
