//! Bounded free list of reusable byte buffers

use super::stats::Stats;
use bytes::BytesMut;
use std::sync::Arc;
use tracing::trace;

/// Free list of retired buffers
///
/// Lives inside the [`TickedBuffer`](super::TickedBuffer) state and is only
/// touched under its lock, so it needs no synchronization of its own.
/// Every miss is counted in the shared [`Stats`].
pub struct BufferPool {
    free: Vec<BytesMut>,
    /// Maximum number of buffers retained
    capacity: usize,
    /// Capacity hint for freshly allocated buffers
    buffer_capacity: usize,
    stats: Arc<Stats>,
}

impl BufferPool {
    /// Create an empty pool retaining at most `capacity` buffers of
    /// `buffer_capacity` bytes each
    pub fn new(capacity: usize, buffer_capacity: usize, stats: Arc<Stats>) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
            buffer_capacity,
            stats,
        }
    }

    /// Hand out an empty buffer, reusing a retired one when available
    pub fn get(&mut self) -> BytesMut {
        match self.free.pop() {
            Some(buf) => buf,
            None => {
                self.stats.record_allocation();
                crate::metrics::record_allocation();
                trace!(capacity = self.buffer_capacity, "Allocating buffer");
                BytesMut::with_capacity(self.buffer_capacity)
            }
        }
    }

    /// Retire a buffer. It is kept if the pool has room, dropped otherwise.
    pub fn put(&mut self, mut buf: BytesMut) {
        if self.free.len() >= self.capacity || buf.capacity() < self.buffer_capacity {
            return;
        }
        buf.clear();
        self.free.push(buf);
    }

    /// Buffers currently available for reuse
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Maximum number of buffers retained
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Release all retained buffers
    pub fn clear(&mut self) {
        self.free.clear();
    }
}
