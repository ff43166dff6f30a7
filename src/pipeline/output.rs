use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, error};

use super::sender::{RecordSender, SendError};
use crate::aggregation::{self, AggregationError, Aggregator, PartitionKey};
use crate::config::Config;
use crate::record::FieldInjector;

#[derive(Debug)]
pub enum OutputError {
    Aggregation(AggregationError),
    Send(SendError),
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::Aggregation(e) => write!(f, "aggregation failed: {}", e),
            OutputError::Send(e) => write!(f, "put_record failed: {}", e),
        }
    }
}

impl std::error::Error for OutputError {}

impl From<SendError> for OutputError {
    fn from(e: SendError) -> Self {
        OutputError::Send(e)
    }
}

/// What happened to a written chunk
#[derive(Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Sent {
        records: usize,
        bytes: usize,
        partition_key: String,
    },
    /// Too large to ever fit; dropped without a send attempt
    Dropped { size: usize, limit: usize },
    Empty,
}

/// Formats records and writes chunks of them as aggregated records.
///
/// The transport is supplied by the caller, so one output can be driven by
/// the Kinesis client in production and by a recording sender in tests.
pub struct AggregationOutput<S> {
    stream_name: String,
    partition_key: PartitionKey,
    injector: FieldInjector,
    aggregator: Aggregator,
    sender: S,
}

impl<S: RecordSender> AggregationOutput<S> {
    pub fn new(config: &Config, sender: S) -> Self {
        Self {
            stream_name: config.stream_name.clone(),
            partition_key: PartitionKey::from_fixed(config.fixed_partition_key.as_deref()),
            injector: FieldInjector::from_config(config),
            aggregator: Aggregator::new(),
            sender,
        }
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Inject time and tag fields and encode one record as a fragment.
    pub fn format(
        &self,
        tag: &str,
        time: DateTime<Utc>,
        record: Map<String, JsonValue>,
    ) -> Result<Bytes, AggregationError> {
        let record = self.injector.inject(tag, time, record);
        aggregation::encode(&record)
    }

    /// Aggregate a chunk of fragments and send it as one record.
    #[tracing::instrument(
        name = "kinesis_write",
        skip(self, chunk),
        fields(stream = %self.stream_name, record_count = chunk.len())
    )]
    pub async fn write(&self, chunk: &[Bytes]) -> Result<WriteOutcome, OutputError> {
        if chunk.is_empty() {
            return Ok(WriteOutcome::Empty);
        }

        let partition_key = self.partition_key.next_key();
        let frame = match self.aggregator.aggregate(&partition_key, chunk) {
            Ok(frame) => frame,
            Err(AggregationError::Oversize { size, limit }) => {
                // Not an error for the caller to retry: the chunk can never fit.
                error!(
                    size,
                    limit, "can't emit aggregated record larger than the shard limit, dropping"
                );
                return Ok(WriteOutcome::Dropped { size, limit });
            }
            Err(e) => return Err(OutputError::Aggregation(e)),
        };

        let bytes = frame.len();
        self.sender
            .put_record(&self.stream_name, frame, &partition_key)
            .await?;

        debug!(bytes, partition_key = %partition_key, "aggregated record sent");
        Ok(WriteOutcome::Sent {
            records: chunk.len(),
            bytes,
            partition_key,
        })
    }
}
