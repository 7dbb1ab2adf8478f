//! Metrics emitted through the `metrics` facade
//!
//! Nothing is exported unless the embedding application installs a recorder
//! (the `tickbuf` binary can install a Prometheus exporter).

use ::metrics::{counter, describe_counter, Unit};
use tracing::info;

pub const WRITES_TOTAL: &str = "tickbuf_writes_total";
pub const BYTES_TOTAL: &str = "tickbuf_bytes_total";
pub const FLUSHES_TOTAL: &str = "tickbuf_flushes_total";
pub const FLUSH_ERRORS_TOTAL: &str = "tickbuf_flush_errors_total";
pub const BUFFER_ALLOCATIONS_TOTAL: &str = "tickbuf_buffer_allocations_total";

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    info!("Registering tickbuf metric descriptions");

    describe_counter!(WRITES_TOTAL, Unit::Count, "Write calls accepted");
    describe_counter!(BYTES_TOTAL, Unit::Bytes, "Bytes accepted by write calls");
    describe_counter!(
        FLUSHES_TOTAL,
        Unit::Count,
        "Successful sink writes, labelled by trigger"
    );
    describe_counter!(
        FLUSH_ERRORS_TOTAL,
        Unit::Count,
        "Failed sink writes, labelled by trigger"
    );
    describe_counter!(
        BUFFER_ALLOCATIONS_TOTAL,
        Unit::Count,
        "Buffers allocated because the pool was empty"
    );
}

pub(crate) fn record_write(bytes: usize) {
    counter!(WRITES_TOTAL).increment(1);
    counter!(BYTES_TOTAL).increment(bytes as u64);
}

pub(crate) fn record_flush(trigger: &'static str) {
    counter!(FLUSHES_TOTAL, "trigger" => trigger).increment(1);
}

pub(crate) fn record_flush_error(trigger: &'static str) {
    counter!(FLUSH_ERRORS_TOTAL, "trigger" => trigger).increment(1);
}

pub(crate) fn record_allocation() {
    counter!(BUFFER_ALLOCATIONS_TOTAL).increment(1);
}
