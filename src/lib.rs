// src/lib.rs
//! Ship log records to Kinesis Data Streams as KPL aggregated records.

pub mod aggregation;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod record;

#[cfg(feature = "kinesis")]
pub mod kinesis;

// Re-export tracing for use in other modules
pub use tracing;

pub use aggregation::{AggregationError, Aggregator, PartitionKey};
pub use config::{Config, ConfigError};
pub use pipeline::{
    forward, AggregationOutput, ChunkBuffer, ForwardStats, OutputError, RecordSender,
    RetryingSender, SendError, WriteOutcome,
};
