//! Buffer configuration
//!
//! Settings are layered the usual way: built-in defaults, then an optional
//! TOML file, then `TICKBUF_*` environment variables.
//!
//! ```toml
//! buffer_size = 16384
//! flush_interval_ms = 250
//! pool_size = 8
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default size threshold (4 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Default tick interval
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of retired buffers kept for reuse
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Longest accepted tick interval (one year)
pub const MAX_FLUSH_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Environment variable prefix (`TICKBUF_BUFFER_SIZE`, ...)
pub const ENV_PREFIX: &str = "TICKBUF";

/// Configuration for a [`TickedBuffer`](crate::TickedBuffer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Size threshold in bytes that triggers a flush
    pub buffer_size: usize,

    /// Tick interval for time triggered flushes. Zero disables ticking.
    #[serde(rename = "flush_interval_ms", with = "duration_ms")]
    pub flush_interval: Duration,

    /// Maximum number of retired buffers retained for reuse
    pub pool_size: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl BufferConfig {
    /// Set the size threshold in bytes
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the tick interval (`Duration::ZERO` disables ticks)
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Set how many retired buffers the pool keeps
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Whether tick triggered flushing is enabled
    pub fn ticks_enabled(&self) -> bool {
        !self.flush_interval.is_zero()
    }

    /// Reject configurations the buffer cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.flush_interval > MAX_FLUSH_INTERVAL {
            return Err(Error::InvalidConfig(format!(
                "flush_interval must be at most {:?}, got {:?}",
                MAX_FLUSH_INTERVAL, self.flush_interval
            )));
        }
        Ok(())
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults, then `path` (if given), then `TICKBUF_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!(path = ?path, "Loading buffer configuration file");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }
}

/// `Duration` <-> integer milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
