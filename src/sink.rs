//! Sinks: the byte-accepting side of a [`TickedBuffer`](crate::TickedBuffer)
//!
//! A sink receives whole buffer generations, one call per flush. It is shared
//! behind an `Arc` and called with `&self`, so implementations synchronize
//! internally if they need mutable state.

use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Destination for flushed bytes
pub trait Sink: Send + Sync {
    /// Write `buf` as a single call. `Ok(n)` with `n == buf.len()` is success.
    fn write(&self, buf: &[u8]) -> io::Result<usize>;
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }
}

/// Adapts any [`io::Write`] into a [`Sink`]
///
/// Each sink call is a `write_all` followed by a `flush` on the wrapped writer,
/// so a flushed generation is handed to the OS before the call returns.
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: io::Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Unwrap the inner writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: io::Write + Send> Sink for WriterSink<W> {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut writer = self.writer.lock();
        writer.write_all(buf)?;
        writer.flush()?;
        Ok(buf.len())
    }
}

/// In-memory sink that records every call
///
/// Used by the bench harness and tests. Retaining the payloads is optional so
/// long benchmark runs do not grow without bound.
#[derive(Default)]
pub struct MemorySink {
    calls: AtomicU64,
    bytes: AtomicU64,
    retained: Option<Mutex<Vec<Vec<u8>>>>,
}

impl MemorySink {
    /// Counting-only sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that also keeps a copy of each call's payload
    pub fn retaining() -> Self {
        Self {
            retained: Some(Mutex::new(Vec::new())),
            ..Self::default()
        }
    }

    /// Number of sink calls observed
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Acquire)
    }

    /// Total bytes observed across all calls
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Acquire)
    }

    /// Payloads of each call in arrival order (empty unless retaining)
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.retained
            .as_ref()
            .map(|r| r.lock().clone())
            .unwrap_or_default()
    }

    /// All retained bytes concatenated in arrival order
    pub fn contents(&self) -> Vec<u8> {
        self.payloads().concat()
    }
}

impl Sink for MemorySink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        if let Some(retained) = &self.retained {
            retained.lock().push(buf.to_vec());
        }
        self.calls.fetch_add(1, Ordering::AcqRel);
        self.bytes.fetch_add(buf.len() as u64, Ordering::AcqRel);
        Ok(buf.len())
    }
}
