//! KPL record aggregation: encode, merge, size-check and frame.
//!
//! Records flow through [`encoder::encode`] into single-record fragments.
//! An [`Aggregator`] admits a batch of fragments against the size ceiling,
//! merges them behind a partition key header and packs the result into the
//! exact bytes sent to Kinesis.

pub mod encoder;
pub mod frame;
pub mod governor;
pub mod merger;
pub mod model;

use bytes::Bytes;
use tracing::debug;

pub use encoder::{encode, encode_with_tags};
pub use frame::pack;
pub use governor::{SizeGovernor, EFFECTIVE_CEILING, PUT_RECORD_MAX_DATA_SIZE};
pub use merger::{ConcatMerger, Merger, ReencodeMerger};

/// Partition key table slot every record points at.
///
/// Never 0: serializers that elide default values would drop a zero index,
/// and the format requires the field to be present.
pub const PARTITION_KEY_INDEX: u64 = 1;

/// Unused entry occupying slot 0 of the partition key table.
pub const PLACEHOLDER_PARTITION_KEY: &str = "";

#[derive(Debug)]
pub enum AggregationError {
    /// A record could not be represented as JSON.
    Encoding(String),
    /// The records-only payload exceeds the ceiling. Never retried.
    Oversize { size: usize, limit: usize },
    /// Fragment bytes could not be decoded for merging.
    Fragment(String),
}

impl std::fmt::Display for AggregationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationError::Encoding(e) => write!(f, "encoding error: {}", e),
            AggregationError::Oversize { size, limit } => write!(
                f,
                "aggregated record of {} bytes exceeds limit of {} bytes",
                size, limit
            ),
            AggregationError::Fragment(e) => write!(f, "invalid fragment: {}", e),
        }
    }
}

impl std::error::Error for AggregationError {}

/// Turns a batch of fragments into one framed aggregated record.
#[derive(Clone, Debug, Default)]
pub struct Aggregator<M = ConcatMerger> {
    merger: M,
    governor: SizeGovernor,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: Merger> Aggregator<M> {
    pub fn with_merger(merger: M) -> Self {
        Self {
            merger,
            governor: SizeGovernor::default(),
        }
    }

    pub fn governor(&self) -> &SizeGovernor {
        &self.governor
    }

    /// Admit, merge and pack `fragments` under `partition_key`.
    ///
    /// The size check runs on the records-only payload before any header or
    /// checksum work.
    pub fn aggregate(
        &self,
        partition_key: &str,
        fragments: &[Bytes],
    ) -> Result<Bytes, AggregationError> {
        let records_len: usize = fragments.iter().map(Bytes::len).sum();
        self.governor.admit_len(records_len)?;

        let merged = self.merger.merge(partition_key, fragments)?;
        let frame = pack(&merged);

        debug!(
            records = fragments.len(),
            records_len,
            frame_len = frame.len(),
            "packed aggregated record"
        );
        Ok(frame)
    }
}

/// How each batch picks its partition key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartitionKey {
    Fixed(String),
    /// A fresh UUID v4 per batch, spreading batches across shards.
    Random,
}

impl PartitionKey {
    pub fn from_fixed(fixed: Option<&str>) -> Self {
        match fixed {
            Some(key) => PartitionKey::Fixed(key.to_string()),
            None => PartitionKey::Random,
        }
    }

    pub fn next_key(&self) -> String {
        match self {
            PartitionKey::Fixed(key) => key.clone(),
            PartitionKey::Random => uuid::Uuid::new_v4().to_string(),
        }
    }
}
