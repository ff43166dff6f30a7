use bytes::{Bytes, BytesMut};
use prost::Message;

use super::model::AggregatedRecord;
use super::{AggregationError, PLACEHOLDER_PARTITION_KEY};

/// Combines single-record fragments into one aggregated record.
pub trait Merger {
    fn merge(&self, partition_key: &str, fragments: &[Bytes]) -> Result<Bytes, AggregationError>;
}

/// Header carrying only the partition key table.
///
/// Index 0 holds a placeholder; every fragment record points at index 1.
pub fn header(partition_key: &str) -> AggregatedRecord {
    AggregatedRecord {
        partition_key_table: vec![
            PLACEHOLDER_PARTITION_KEY.to_string(),
            partition_key.to_string(),
        ],
        explicit_hash_key_table: Vec::new(),
        records: Vec::new(),
    }
}

/// Merges by byte concatenation: header bytes followed by every fragment.
///
/// A repeated field is encoded as independent entries with no outer
/// wrapper, so concatenated messages decode as one message whose `records`
/// are the union of all inputs, in order. This holds only while fragments
/// leave every other field unset.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConcatMerger;

impl Merger for ConcatMerger {
    fn merge(&self, partition_key: &str, fragments: &[Bytes]) -> Result<Bytes, AggregationError> {
        let header = header(partition_key);
        let records_len: usize = fragments.iter().map(Bytes::len).sum();

        let mut buf = BytesMut::with_capacity(header.encoded_len() + records_len);
        header
            .encode(&mut buf)
            .map_err(|e| AggregationError::Encoding(e.to_string()))?;
        for fragment in fragments {
            buf.extend_from_slice(fragment);
        }
        Ok(buf.freeze())
    }
}

/// Decodes every fragment and re-encodes a single message.
///
/// Slower than [`ConcatMerger`], but does not depend on the wire format's
/// concatenation property.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReencodeMerger;

impl Merger for ReencodeMerger {
    fn merge(&self, partition_key: &str, fragments: &[Bytes]) -> Result<Bytes, AggregationError> {
        let mut merged = header(partition_key);

        for (idx, fragment) in fragments.iter().enumerate() {
            let decoded = AggregatedRecord::decode(fragment.as_ref())
                .map_err(|e| AggregationError::Fragment(format!("fragment {}: {}", idx, e)))?;
            if !decoded.partition_key_table.is_empty()
                || !decoded.explicit_hash_key_table.is_empty()
            {
                return Err(AggregationError::Fragment(format!(
                    "fragment {} populates a key table",
                    idx
                )));
            }
            merged.records.extend(decoded.records);
        }

        Ok(Bytes::from(merged.encode_to_vec()))
    }
}
