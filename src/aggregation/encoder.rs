use bytes::Bytes;
use prost::Message;
use serde::Serialize;

use super::model::{AggregatedRecord, Record, Tag};
use super::{AggregationError, PARTITION_KEY_INDEX};

/// Encode one application record as a single-record aggregated fragment.
///
/// The record is serialized to compact JSON and stored as the `data` of a
/// [`Record`] pointing at [`PARTITION_KEY_INDEX`], wrapped as the only entry
/// of an [`AggregatedRecord`]. Fragments populate nothing but `records`, so
/// they can be merged by concatenation.
pub fn encode<T>(record: &T) -> Result<Bytes, AggregationError>
where
    T: Serialize + ?Sized,
{
    encode_with_tags(record, Vec::new())
}

/// Like [`encode`], attaching tags to the record.
pub fn encode_with_tags<T>(record: &T, tags: Vec<Tag>) -> Result<Bytes, AggregationError>
where
    T: Serialize + ?Sized,
{
    let data = serde_json::to_vec(record).map_err(|e| AggregationError::Encoding(e.to_string()))?;
    Ok(wrap_data(data, tags))
}

/// Wrap already-serialized record bytes as a fragment.
pub(crate) fn wrap_data(data: Vec<u8>, tags: Vec<Tag>) -> Bytes {
    let fragment = AggregatedRecord {
        partition_key_table: Vec::new(),
        explicit_hash_key_table: Vec::new(),
        records: vec![Record {
            partition_key_index: PARTITION_KEY_INDEX,
            explicit_hash_key_index: None,
            data,
            tags,
        }],
    };
    Bytes::from(fragment.encode_to_vec())
}
