//! The ticked buffer: size and time triggered write coalescing
//!
//! # Locking
//!
//! A single `parking_lot::Mutex` guards the active buffer, the pool and the
//! open/closed flag. Writers, the flush timer and `close` all take it before
//! touching any of them, and the sink is called while it is held. One sink
//! call therefore always carries exactly one buffer generation, and bytes of a
//! single `write` are never split or interleaved with another caller's.
//!
//! # Data loss
//!
//! Failed sink calls are not retried and their bytes are not re-buffered.
//! A caller that sees an error from [`TickedBuffer::write`] or
//! [`TickedBuffer::close`] must assume that call's bytes never reached the
//! sink. Failures of tick triggered flushes are logged, counted in
//! `flush_errors` and retained for [`TickedBuffer::take_tick_error`].

use super::pool::BufferPool;
use super::stats::{Stats, StatsSnapshot};
use super::timer::FlushTimer;
use crate::config::BufferConfig;
use crate::error::{Error, Result};
use crate::sink::Sink;
use bytes::BytesMut;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What caused a sink call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushTrigger {
    /// Threshold crossed inside `write`
    Size,
    /// Payload larger than the threshold: pending data, then the payload
    /// itself handed to the sink directly
    Oversize,
    /// Flush timer
    Tick,
    /// Explicit `flush()`
    Manual,
    /// Final flush in `close()`
    Close,
}

impl FlushTrigger {
    fn as_str(self) -> &'static str {
        match self {
            FlushTrigger::Size => "size",
            FlushTrigger::Oversize => "oversize",
            FlushTrigger::Tick => "tick",
            FlushTrigger::Manual => "manual",
            FlushTrigger::Close => "close",
        }
    }
}

/// Mutable state behind the buffer lock
struct State {
    /// Current generation. Empty with zero capacity until the first append
    /// after a flush, when a buffer is taken from the pool.
    active: BytesMut,
    pool: BufferPool,
    closed: bool,
}

/// State shared with the flush timer thread
struct Shared {
    sink: Arc<dyn Sink>,
    threshold: usize,
    state: Mutex<State>,
    stats: Arc<Stats>,
    tick_error: Mutex<Option<Error>>,
}

impl Shared {
    /// Hand the active generation to the sink and retire its buffer.
    /// No-op when the generation is empty.
    fn flush_locked(&self, state: &mut State, trigger: FlushTrigger) -> Result<()> {
        if state.active.is_empty() {
            return Ok(());
        }

        let generation = std::mem::take(&mut state.active);
        let result = self.write_sink(&generation, trigger);
        state.pool.put(generation);
        result
    }

    /// One sink call, with accounting
    fn write_sink(&self, data: &[u8], trigger: FlushTrigger) -> Result<()> {
        match self.sink.write(data) {
            Ok(written) if written == data.len() => {
                self.stats.record_flush();
                crate::metrics::record_flush(trigger.as_str());
                debug!(trigger = trigger.as_str(), bytes = data.len(), "Flushed buffer");
                Ok(())
            }
            Ok(written) => {
                self.stats.record_flush_error();
                crate::metrics::record_flush_error(trigger.as_str());
                warn!(
                    trigger = trigger.as_str(),
                    expected = data.len(),
                    written,
                    "Short write to sink, dropping buffer"
                );
                Err(Error::ShortWrite {
                    expected: data.len(),
                    written,
                })
            }
            Err(e) => {
                self.stats.record_flush_error();
                crate::metrics::record_flush_error(trigger.as_str());
                warn!(
                    trigger = trigger.as_str(),
                    bytes = data.len(),
                    error = %e,
                    "Sink write failed, dropping buffer"
                );
                Err(Error::SinkWriteFailed(e))
            }
        }
    }

    /// Timer callback: flush whatever is pending
    fn tick(&self) {
        let mut state = self.state.lock();
        if state.closed || state.active.is_empty() {
            return;
        }

        if let Err(e) = self.flush_locked(&mut state, FlushTrigger::Tick) {
            error!(error = %e, "Tick triggered flush failed");
            *self.tick_error.lock() = Some(e);
        }
    }
}

/// Write coalescer flushing on a size threshold or a timer tick
///
/// Safe to share between threads (`&self` everywhere). Dropping an open
/// buffer closes it.
pub struct TickedBuffer {
    shared: Arc<Shared>,
    timer: Mutex<Option<FlushTimer>>,
    config: BufferConfig,
}

impl TickedBuffer {
    /// Create a buffer in front of `sink`
    ///
    /// Fails with [`Error::InvalidConfig`] when the configuration is rejected.
    /// The flush timer starts immediately unless the interval is zero.
    pub fn new(sink: Arc<dyn Sink>, config: BufferConfig) -> Result<Self> {
        config.validate()?;

        let stats = Arc::new(Stats::new());
        let pool = BufferPool::new(config.pool_size, config.buffer_size, Arc::clone(&stats));

        let shared = Arc::new(Shared {
            sink,
            threshold: config.buffer_size,
            state: Mutex::new(State {
                active: BytesMut::new(),
                pool,
                closed: false,
            }),
            stats,
            tick_error: Mutex::new(None),
        });

        let timer = if config.ticks_enabled() {
            let ticker = Arc::clone(&shared);
            Some(FlushTimer::start(config.flush_interval, move || ticker.tick())?)
        } else {
            None
        };

        info!(
            buffer_size = config.buffer_size,
            flush_interval = ?config.flush_interval,
            pool_size = config.pool_size,
            "Ticked buffer opened"
        );

        Ok(Self {
            shared,
            timer: Mutex::new(timer),
            config,
        })
    }

    /// Create a buffer with [`BufferConfig::default`]
    pub fn with_defaults(sink: Arc<dyn Sink>) -> Result<Self> {
        Self::new(sink, BufferConfig::default())
    }

    /// Accept `payload` in full
    ///
    /// Returns `payload.len()` on success. Crossing the threshold flushes
    /// synchronously before returning. A payload larger than the threshold
    /// first flushes pending data, then goes to the sink in one direct call.
    /// After [`close`](Self::close) every call fails with
    /// [`Error::BufferClosed`] and nothing is accepted.
    pub fn write(&self, payload: &[u8]) -> Result<usize> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        if state.closed {
            return Err(Error::BufferClosed);
        }

        shared.stats.record_write(payload.len());
        crate::metrics::record_write(payload.len());

        if payload.is_empty() {
            return Ok(0);
        }

        if payload.len() > shared.threshold {
            shared.flush_locked(&mut state, FlushTrigger::Oversize)?;
            shared.write_sink(payload, FlushTrigger::Oversize)?;
            return Ok(payload.len());
        }

        if state.active.capacity() == 0 {
            state.active = state.pool.get();
        }
        state.active.extend_from_slice(payload);

        if state.active.len() >= shared.threshold {
            shared.flush_locked(&mut state, FlushTrigger::Size)?;
        }

        Ok(payload.len())
    }

    /// Flush pending data now, regardless of size or timer
    pub fn flush(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(Error::BufferClosed);
        }
        self.shared.flush_locked(&mut state, FlushTrigger::Manual)
    }

    /// Stop the timer, flush residual data once and reject further writes
    ///
    /// Returns the final flush's error, if any. Closing again is a no-op
    /// returning `Ok(())`.
    pub fn close(&self) -> Result<()> {
        let timer = self.timer.lock().take();
        if let Some(mut timer) = timer {
            timer.cancel();
        }

        let mut state = self.shared.state.lock();
        if state.closed {
            return Ok(());
        }

        let result = self.shared.flush_locked(&mut state, FlushTrigger::Close);
        state.closed = true;
        state.pool.clear();
        drop(state);

        let stats = self.shared.stats.snapshot();
        info!(
            writes = stats.writes,
            bytes = stats.bytes,
            flushes = stats.flushes,
            buffer_allocs = stats.buffer_allocs,
            flush_errors = stats.flush_errors,
            "Ticked buffer closed"
        );

        result
    }

    /// Snapshot of the counters. Readable at any time, including after close.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Take the most recent tick triggered flush failure, if any
    pub fn take_tick_error(&self) -> Option<Error> {
        self.shared.tick_error.lock().take()
    }

    /// Whether `close` has completed
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Bytes in the active generation
    pub fn buffered_len(&self) -> usize {
        self.shared.state.lock().active.len()
    }

    /// Retired buffers waiting in the pool
    pub fn pooled_buffers(&self) -> usize {
        self.shared.state.lock().pool.available()
    }

    /// Configuration the buffer was built with
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }
}

impl Drop for TickedBuffer {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!(error = %e, "Final flush failed while dropping ticked buffer");
        }
    }
}

impl io::Write for &TickedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        TickedBuffer::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        TickedBuffer::flush(self).map_err(io::Error::from)
    }
}

impl io::Write for TickedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        TickedBuffer::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        TickedBuffer::flush(self).map_err(io::Error::from)
    }
}
