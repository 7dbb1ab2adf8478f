//! Write coalescing core
//!
//! # Architecture
//!
//! ```text
//! writers ──write()──┐
//!                    ▼
//!            TickedBuffer ── Mutex<State> ──┬─→ active BytesMut (one generation)
//!                    ▲                      └─→ BufferPool (retired buffers)
//! FlushTimer ──tick()┘
//!                    │
//!                    └─→ Sink::write(generation)   one call per generation
//!
//! Stats (atomics) ←── updated by writes, flushes and pool misses
//! ```
//!
//! A generation is flushed when it reaches the size threshold, when the
//! timer ticks with data pending, on an explicit `flush()`, or on `close()`.

pub mod bench;
pub mod pool;
pub mod stats;
pub mod ticked;
pub mod timer;

pub use bench::BenchReport;
pub use pool::BufferPool;
pub use stats::{Stats, StatsSnapshot};
pub use ticked::TickedBuffer;
pub use timer::FlushTimer;
