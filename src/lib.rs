// TickBuf - Rust Implementation
// A size and tick triggered write coalescing buffer

#![warn(rust_2018_idioms)]

//! `tickbuf` batches many small writes into fewer, larger writes against any
//! byte-accepting [`Sink`].
//!
//! A [`TickedBuffer`] flushes when buffered data reaches the configured size
//! threshold or when its flush timer ticks, whichever happens first.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tickbuf::{BufferConfig, TickedBuffer, WriterSink};
//!
//! # fn main() -> tickbuf::error::Result<()> {
//! let sink = Arc::new(WriterSink::new(std::io::stdout()));
//! let config = BufferConfig::default()
//!     .with_buffer_size(16 * 1024)
//!     .with_flush_interval(Duration::from_millis(250));
//!
//! let buffer = TickedBuffer::new(sink, config)?;
//! buffer.write(b"hello\n")?;
//! buffer.close()?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod metrics;
pub mod pipe;
pub mod sink;

// Re-exports for convenience
pub use buffer::{BufferPool, FlushTimer, Stats, StatsSnapshot, TickedBuffer};
pub use config::BufferConfig;
pub use sink::{MemorySink, Sink, WriterSink};

/// TickBuf error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        /// The buffer has been closed; nothing from the call was accepted.
        #[error("buffer closed")]
        BufferClosed,

        /// The sink rejected a flush. The flushed bytes are dropped.
        #[error("sink write failed: {0}")]
        SinkWriteFailed(#[from] std::io::Error),

        /// The sink reported fewer bytes than it was handed.
        #[error("short write to sink: wrote {written} of {expected} bytes")]
        ShortWrite { expected: usize, written: usize },

        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("Timer error: {0}")]
        Timer(String),

        /// Reading the input stream failed.
        #[error("input read failed: {0}")]
        Input(#[source] std::io::Error),
    }

    impl From<Error> for std::io::Error {
        fn from(err: Error) -> Self {
            match err {
                Error::SinkWriteFailed(e) => e,
                Error::BufferClosed => std::io::Error::new(std::io::ErrorKind::BrokenPipe, err),
                Error::ShortWrite { .. } => std::io::Error::new(std::io::ErrorKind::WriteZero, err),
                other => std::io::Error::other(other),
            }
        }
    }

    impl Error {
        /// Whether the error came out of a sink call (the data involved is lost).
        pub fn is_sink_failure(&self) -> bool {
            matches!(self, Error::SinkWriteFailed(_) | Error::ShortWrite { .. })
        }
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::error::Error;
    use super::*;

    #[test]
    fn test_version_format() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_sink_failure_classification() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(Error::from(io).is_sink_failure());
        assert!(Error::ShortWrite {
            expected: 4,
            written: 2
        }
        .is_sink_failure());
        assert!(!Error::BufferClosed.is_sink_failure());
        assert!(!Error::InvalidConfig("x".into()).is_sink_failure());
    }
}
