//! Operational counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by the buffer, its pool and its timer
///
/// All fields are atomics so a snapshot never needs the buffer lock.
#[derive(Debug, Default)]
pub struct Stats {
    writes: AtomicU64,
    bytes: AtomicU64,
    flushes: AtomicU64,
    buffer_allocs: AtomicU64,
    flush_errors: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one accepted write call of `bytes` length
    pub fn record_write(&self, bytes: usize) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record one successful sink call
    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one failed sink call
    pub fn record_flush_error(&self) {
        self.flush_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one fresh buffer allocation (pool miss)
    pub fn record_allocation(&self) {
        self.buffer_allocs.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            writes: self.writes.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            buffer_allocs: self.buffer_allocs.load(Ordering::Relaxed),
            flush_errors: self.flush_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`Stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Write calls accepted
    pub writes: u64,
    /// Bytes accepted by write calls
    pub bytes: u64,
    /// Successful sink calls
    pub flushes: u64,
    /// Buffers allocated because the pool had none to hand out
    pub buffer_allocs: u64,
    /// Failed sink calls, from any trigger
    pub flush_errors: u64,
}
