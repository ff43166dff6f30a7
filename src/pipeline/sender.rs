use bytes::Bytes;

use super::retry::{with_retry, IsRetryable, RetryConfig};

/// Errors reported by a transport's put-record call
#[derive(Debug)]
pub enum SendError {
    Timeout,
    Network(String),
    /// Shard or KMS throughput exceeded
    Throttled(String),
    /// Internal failure or 5xx on the service side
    Service(String),
    /// The service refused the request; resending cannot help
    Rejected(String),
}

const THROTTLING_CODES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "KMSThrottlingException",
    "ThrottlingException",
    "LimitExceededException",
];

const SERVER_FAILURE_CODES: &[&str] = &["InternalFailureException", "ServiceUnavailableException"];

impl SendError {
    /// Classify an error response by its error code and HTTP status.
    pub fn from_service_response(code: Option<&str>, status: u16, message: String) -> Self {
        let code = code.unwrap_or_default();
        if THROTTLING_CODES.contains(&code) || status == 429 {
            SendError::Throttled(message)
        } else if SERVER_FAILURE_CODES.contains(&code) || status >= 500 {
            SendError::Service(message)
        } else {
            SendError::Rejected(message)
        }
    }
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Timeout => write!(f, "request timed out"),
            SendError::Network(msg) => write!(f, "network error: {}", msg),
            SendError::Throttled(msg) => write!(f, "throttled: {}", msg),
            SendError::Service(msg) => write!(f, "service error: {}", msg),
            SendError::Rejected(msg) => write!(f, "rejected: {}", msg),
        }
    }
}

impl std::error::Error for SendError {}

impl IsRetryable for SendError {
    fn is_retryable(&self) -> bool {
        match self {
            SendError::Timeout => true,
            SendError::Network(_) => true,
            SendError::Throttled(_) => true,
            SendError::Service(_) => true,
            SendError::Rejected(_) => false,
        }
    }
}

/// Transport for framed aggregated records (abstracts the Kinesis client)
#[async_trait::async_trait]
pub trait RecordSender: Send + Sync {
    async fn put_record(
        &self,
        stream_name: &str,
        data: Bytes,
        partition_key: &str,
    ) -> Result<(), SendError>;
}

#[async_trait::async_trait]
impl<S: RecordSender + ?Sized> RecordSender for std::sync::Arc<S> {
    async fn put_record(
        &self,
        stream_name: &str,
        data: Bytes,
        partition_key: &str,
    ) -> Result<(), SendError> {
        (**self).put_record(stream_name, data, partition_key).await
    }
}

/// Wraps a sender, retrying transient failures with backoff.
pub struct RetryingSender<S> {
    inner: S,
    config: RetryConfig,
}

impl<S: RecordSender> RetryingSender<S> {
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<S: RecordSender> RecordSender for RetryingSender<S> {
    async fn put_record(
        &self,
        stream_name: &str,
        data: Bytes,
        partition_key: &str,
    ) -> Result<(), SendError> {
        with_retry(&self.config, || {
            self.inner
                .put_record(stream_name, data.clone(), partition_key)
        })
        .await
    }
}
