// src/pipeline/mod.rs
pub mod buffer;
pub mod forward;
pub mod output;
pub mod retry;
pub mod sender;

pub use buffer::ChunkBuffer;
pub use forward::{forward, ForwardStats};
pub use output::{AggregationOutput, OutputError, WriteOutcome};
pub use retry::RetryConfig;
pub use sender::{RecordSender, RetryingSender, SendError};
