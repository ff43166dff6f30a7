//! Line-oriented forwarding: NDJSON in, aggregated records out.

use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info, warn};

use super::buffer::ChunkBuffer;
use super::output::{AggregationOutput, WriteOutcome};
use super::sender::RecordSender;

/// Counters for one forwarding run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ForwardStats {
    /// Lines accepted and buffered
    pub records: usize,
    /// Lines that were not JSON objects or failed to encode
    pub skipped: usize,
    pub chunks_sent: usize,
    pub chunks_dropped: usize,
    pub chunks_failed: usize,
}

enum Line {
    Blank,
    Skipped,
    Fragment(Bytes),
}

/// Read NDJSON lines until EOF, buffering fragments and writing a chunk when
/// the next fragment would overflow it, when `flush_interval` elapses, and
/// once more at EOF.
///
/// Write failures are logged and counted; only a read error ends the run early.
pub async fn forward<R, S>(
    reader: R,
    output: &AggregationOutput<S>,
    tag: &str,
    chunk_limit: usize,
    flush_interval: Duration,
) -> std::io::Result<ForwardStats>
where
    R: AsyncBufRead + Unpin,
    S: RecordSender,
{
    let mut stats = ForwardStats::default();
    let mut buffer = ChunkBuffer::new(chunk_limit);
    let mut lines = reader.lines();
    let mut ticker = tokio::time::interval(flush_interval);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let fragment = match format_line(output, tag, &line) {
                    Line::Fragment(fragment) => fragment,
                    Line::Skipped => {
                        stats.skipped += 1;
                        continue;
                    }
                    Line::Blank => continue,
                };
                stats.records += 1;
                if let Some(chunk) = buffer.push(fragment) {
                    flush(output, chunk, &mut stats).await;
                }
            }
            _ = ticker.tick() => {
                if !buffer.is_empty() {
                    flush(output, buffer.take(), &mut stats).await;
                }
            }
        }
    }

    if !buffer.is_empty() {
        flush(output, buffer.take(), &mut stats).await;
    }
    Ok(stats)
}

fn format_line<S: RecordSender>(output: &AggregationOutput<S>, tag: &str, line: &str) -> Line {
    if line.trim().is_empty() {
        return Line::Blank;
    }

    let record = match serde_json::from_str::<JsonValue>(line) {
        Ok(JsonValue::Object(map)) => map,
        Ok(_) => {
            warn!("skipping line that is not a JSON object");
            return Line::Skipped;
        }
        Err(e) => {
            warn!(error = %e, "skipping unparseable line");
            return Line::Skipped;
        }
    };

    match output.format(tag, Utc::now(), record) {
        Ok(fragment) => Line::Fragment(fragment),
        Err(e) => {
            error!(error = %e, "failed to encode record");
            Line::Skipped
        }
    }
}

async fn flush<S: RecordSender>(
    output: &AggregationOutput<S>,
    chunk: Vec<Bytes>,
    stats: &mut ForwardStats,
) {
    match output.write(&chunk).await {
        Ok(WriteOutcome::Sent {
            records,
            bytes,
            partition_key,
        }) => {
            stats.chunks_sent += 1;
            info!(records, bytes, partition_key = %partition_key, "flushed chunk");
        }
        // Logged by the output already.
        Ok(WriteOutcome::Dropped { .. }) => stats.chunks_dropped += 1,
        Ok(WriteOutcome::Empty) => {}
        Err(e) => {
            stats.chunks_failed += 1;
            error!(error = %e, records = chunk.len(), "failed to flush chunk");
        }
    }
}
