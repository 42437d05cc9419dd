//! Scratch buffer pooling for the writer and reader.
//!
//! Writers and readers rent one scratch buffer from a [`BufferPool`], use it
//! to assemble escaped or unescaped field text, and hand it back on close or
//! when they need a larger one. The pool is owned by the stream instance, so
//! renting and returning needs no synchronization.
//!
//! ```rust
//! use edi_codec::{BufferPool, FreeListPool};
//!
//! let mut pool = FreeListPool::new();
//! let buffer = pool.rent(64);
//! assert!(buffer.capacity() >= 64);
//! pool.give_back(buffer);
//! assert_eq!(pool.available(), 1);
//! ```

/// Capacity rented when no size hint is known; fits an ISO date with offset.
pub const DEFAULT_BUFFER_CAPACITY: usize = 35;

/// Source of reusable scratch buffers.
pub trait BufferPool {
    /// Returns an empty buffer with at least `min_capacity` bytes of capacity.
    fn rent(&mut self, min_capacity: usize) -> String;

    /// Takes a buffer back. It must not be used by the caller afterwards.
    fn give_back(&mut self, buffer: String);
}

/// Free-list pool: keeps returned buffers and hands back the first one large enough.
#[derive(Debug)]
pub struct FreeListPool {
    free: Vec<String>,
    max_retained: usize,
}

impl Default for FreeListPool {
    fn default() -> Self {
        FreeListPool::new()
    }
}

impl FreeListPool {
    pub fn new() -> Self {
        FreeListPool {
            free: Vec::new(),
            max_retained: 8,
        }
    }

    /// Keeps at most `max_retained` idle buffers.
    #[must_use]
    pub fn with_max_retained(mut self, max_retained: usize) -> Self {
        self.max_retained = max_retained;
        self
    }

    /// Number of idle buffers held by the pool.
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

impl BufferPool for FreeListPool {
    fn rent(&mut self, min_capacity: usize) -> String {
        match self.free.iter().position(|b| b.capacity() >= min_capacity) {
            Some(index) => self.free.swap_remove(index),
            None => String::with_capacity(min_capacity.max(DEFAULT_BUFFER_CAPACITY)),
        }
    }

    fn give_back(&mut self, mut buffer: String) {
        if self.free.len() < self.max_retained {
            buffer.clear();
            self.free.push(buffer);
        }
    }
}

/// Scratch buffer checked out of a pool, grown by swapping in a larger one.
#[derive(Debug, Default)]
pub(crate) struct Scratch {
    buffer: Option<String>,
}

impl Scratch {
    /// Returns the cleared buffer, renting or replacing it to fit `capacity`.
    pub(crate) fn get<P: BufferPool>(&mut self, pool: &mut P, capacity: usize) -> &mut String {
        let needs_new = self
            .buffer
            .as_ref()
            .map_or(true, |b| b.capacity() < capacity);
        if needs_new {
            let fresh = pool.rent(capacity);
            if let Some(old) = self.buffer.replace(fresh) {
                pool.give_back(old);
            }
        }
        let buffer = self.buffer.get_or_insert_with(String::new);
        buffer.clear();
        buffer
    }

    pub(crate) fn release<P: BufferPool>(&mut self, pool: &mut P) {
        if let Some(buffer) = self.buffer.take() {
            pool.give_back(buffer);
        }
    }

    #[cfg(test)]
    pub(crate) fn is_rented(&self) -> bool {
        self.buffer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rent_reuses_returned_buffer() {
        let mut pool = FreeListPool::new();
        let mut buffer = pool.rent(10);
        buffer.push_str("dirty");
        let capacity = buffer.capacity();
        pool.give_back(buffer);

        let again = pool.rent(10);
        assert!(again.is_empty());
        assert_eq!(again.capacity(), capacity);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_retention_limit() {
        let mut pool = FreeListPool::new().with_max_retained(1);
        pool.give_back(String::with_capacity(4));
        pool.give_back(String::with_capacity(4));
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_scratch_grows_and_releases() {
        let mut pool = FreeListPool::new();
        let mut scratch = Scratch::default();
        scratch.get(&mut pool, 8).push_str("abc");
        assert!(scratch.is_rented());

        let big = scratch.get(&mut pool, 1024);
        assert!(big.is_empty());
        assert!(big.capacity() >= 1024);
        // The small buffer went back when the large one replaced it.
        assert_eq!(pool.available(), 1);

        scratch.release(&mut pool);
        assert!(!scratch.is_rented());
        assert_eq!(pool.available(), 2);
    }
}
