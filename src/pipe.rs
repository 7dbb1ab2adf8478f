//! Stream input into a [`TickedBuffer`]
//!
//! Input is split on `\n` and each chunk, newline included, becomes one
//! write. Bytes are passed through untouched, so the input need not be UTF-8.

use crate::buffer::TickedBuffer;
use crate::error::{Error, Result};
use std::future::Future;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{error, warn};

/// Copy `reader` into `buffer` until end of input or until `shutdown` resolves
///
/// Returns the number of chunks handed to the buffer. Write failures are
/// logged and the copy continues; read failures end it with
/// [`Error::Input`]. A partial chunk pending at shutdown is still written.
/// The buffer is left open.
///
/// A size triggered flush blocks on the sink, so this must run on a
/// multi-threaded runtime.
pub async fn copy_lines<R, F>(reader: R, buffer: &TickedBuffer, shutdown: F) -> Result<u64>
where
    R: AsyncRead + Unpin,
    F: Future<Output = ()>,
{
    let mut reader = BufReader::new(reader);
    let mut chunk = Vec::new();
    let mut chunks = 0u64;
    tokio::pin!(shutdown);

    loop {
        chunk.clear();
        tokio::select! {
            read = reader.read_until(b'\n', &mut chunk) => {
                if read.map_err(Error::Input)? == 0 {
                    break;
                }
                write_chunk(buffer, &chunk);
                chunks += 1;
            }
            _ = &mut shutdown => {
                warn!("Interrupted, flushing and exiting");
                if !chunk.is_empty() {
                    write_chunk(buffer, &chunk);
                    chunks += 1;
                }
                break;
            }
        }
    }

    Ok(chunks)
}

fn write_chunk(buffer: &TickedBuffer, chunk: &[u8]) {
    if let Err(e) = tokio::task::block_in_place(|| buffer.write(chunk)) {
        error!(error = %e, "Write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BufferConfig;
    use crate::sink::MemorySink;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn buffer(sink: Arc<MemorySink>) -> TickedBuffer {
        let config = BufferConfig::default()
            .with_buffer_size(4096)
            .with_flush_interval(Duration::ZERO);
        TickedBuffer::new(sink, config).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_copy_passes_non_utf8_bytes() {
        let input: &[u8] = b"ok line\n\xff\xfe binary\nafter\n";
        let sink = Arc::new(MemorySink::retaining());
        let buffer = buffer(sink.clone());

        let chunks = copy_lines(input, &buffer, std::future::pending())
            .await
            .unwrap();
        buffer.close().unwrap();

        assert_eq!(chunks, 3);
        assert_eq!(sink.contents(), input);
        assert_eq!(buffer.stats().writes, 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unterminated_last_line_is_kept() {
        let input: &[u8] = b"first\nno newline";
        let sink = Arc::new(MemorySink::retaining());
        let buffer = buffer(sink.clone());

        let chunks = copy_lines(input, &buffer, std::future::pending())
            .await
            .unwrap();
        buffer.close().unwrap();

        assert_eq!(chunks, 2);
        assert_eq!(sink.contents(), input);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shutdown_stops_copy() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let sink = Arc::new(MemorySink::retaining());
        let buffer = buffer(sink.clone());

        tx.write_all(b"before\n").await.unwrap();
        let shutdown = tokio::time::sleep(Duration::from_millis(100));
        let chunks = copy_lines(rx, &buffer, shutdown).await.unwrap();
        buffer.close().unwrap();

        assert_eq!(chunks, 1);
        assert_eq!(sink.contents(), b"before\n");
        drop(tx);
    }
}
