use tracing::warn;

use super::AggregationError;
use crate::config::ConfigError;

/// Hard per-item limit of a Kinesis PutRecord call.
pub const PUT_RECORD_MAX_DATA_SIZE: usize = 1024 * 1024;

/// Bytes reserved for the magic marker, checksum and partition key table.
pub const FRAMING_RESERVE: usize = 200;

/// Largest records-only payload that still fits once framed.
pub const EFFECTIVE_CEILING: usize = PUT_RECORD_MAX_DATA_SIZE - FRAMING_RESERVE;

/// Accepts or rejects a batch before it is merged and packed.
#[derive(Clone, Copy, Debug)]
pub struct SizeGovernor {
    ceiling: usize,
}

impl Default for SizeGovernor {
    fn default() -> Self {
        Self {
            ceiling: EFFECTIVE_CEILING,
        }
    }
}

impl SizeGovernor {
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Check the concatenated records-only payload.
    pub fn admit(&self, candidate: &[u8]) -> Result<(), AggregationError> {
        self.admit_len(candidate.len())
    }

    /// Check a records-only payload by size.
    ///
    /// A rejection is terminal: the same batch can never fit.
    pub fn admit_len(&self, size: usize) -> Result<(), AggregationError> {
        if size > self.ceiling {
            return Err(AggregationError::Oversize {
                size,
                limit: self.ceiling,
            });
        }
        Ok(())
    }
}

/// Startup check of the configured buffer chunk limit.
pub fn check_chunk_limit(chunk_limit: usize) -> Result<(), ConfigError> {
    if chunk_limit > EFFECTIVE_CEILING {
        return Err(ConfigError::ChunkLimitTooLarge {
            chunk_limit,
            ceiling: EFFECTIVE_CEILING,
        });
    }

    if chunk_limit > EFFECTIVE_CEILING / 3 {
        warn!(
            chunk_limit,
            ceiling = EFFECTIVE_CEILING,
            "buffer_chunk_limit is above 1/3 of the per-second shard limit; writes may fail when other producers share the shard"
        );
    }

    Ok(())
}
