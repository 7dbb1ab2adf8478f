//! Throughput harness for the ticked buffer
//!
//! Drives a [`TickedBuffer`] backed by a counting [`MemorySink`] with either
//! one writer or several concurrent writers. Used by `tickbuf bench`.

use super::stats::StatsSnapshot;
use super::ticked::TickedBuffer;
use crate::config::BufferConfig;
use crate::error::Result;
use crate::sink::MemorySink;
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::info;

/// Outcome of one bench run
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub workers: usize,
    pub writes: usize,
    pub payload_size: usize,
    pub elapsed_ms: f64,
    pub writes_per_sec: f64,
    pub sink_calls: u64,
    pub sink_bytes: u64,
    pub stats: StatsSnapshot,
}

/// `writes` writes of `payload_size` bytes from a single thread
pub fn run_sequential(config: BufferConfig, writes: usize, payload_size: usize) -> Result<BenchReport> {
    run_parallel(config, 1, writes, payload_size)
}

/// `writes` writes of `payload_size` bytes spread over `workers` threads
pub fn run_parallel(
    config: BufferConfig,
    workers: usize,
    writes: usize,
    payload_size: usize,
) -> Result<BenchReport> {
    let workers = workers.max(1);
    let sink = Arc::new(MemorySink::new());
    let buffer = TickedBuffer::new(sink.clone(), config)?;
    let payload = vec![0u8; payload_size];

    info!(workers, writes, payload_size, "Starting bench run");
    let start = Instant::now();

    thread::scope(|scope| -> Result<()> {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                // First `writes % workers` workers take one extra write
                let share = writes / workers + usize::from(worker < writes % workers);
                let buffer = &buffer;
                let payload = &payload;
                scope.spawn(move || -> Result<()> {
                    for _ in 0..share {
                        buffer.write(payload)?;
                    }
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(result) => result?,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        Ok(())
    })?;

    buffer.close()?;
    let elapsed = start.elapsed();

    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    let writes_per_sec = if elapsed.as_secs_f64() > 0.0 {
        writes as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    Ok(BenchReport {
        workers,
        writes,
        payload_size,
        elapsed_ms,
        writes_per_sec,
        sink_calls: sink.calls(),
        sink_bytes: sink.bytes(),
        stats: buffer.stats(),
    })
}
