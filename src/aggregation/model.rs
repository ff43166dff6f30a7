//! KPL aggregation message types.
//!
//! Field numbers and labels follow the published aggregation format
//! (https://github.com/awslabs/amazon-kinesis-producer/blob/master/aggregation-format.md)
//! and must not change. Required scalars are always emitted by prost, which
//! the merger relies on for a stable partition key index byte.

/// Optional metadata label attached to a record.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Tag {
    #[prost(string, required, tag = "1")]
    pub key: String,
    #[prost(string, optional, tag = "2")]
    pub value: Option<String>,
}

/// One application record inside an aggregated record.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Record {
    #[prost(uint64, required, tag = "1")]
    pub partition_key_index: u64,
    #[prost(uint64, optional, tag = "2")]
    pub explicit_hash_key_index: Option<u64>,
    #[prost(bytes = "vec", required, tag = "3")]
    pub data: Vec<u8>,
    #[prost(message, repeated, tag = "4")]
    pub tags: Vec<Tag>,
}

/// The transport-level item: key tables plus the packed records.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AggregatedRecord {
    #[prost(string, repeated, tag = "1")]
    pub partition_key_table: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    pub explicit_hash_key_table: Vec<String>,
    #[prost(message, repeated, tag = "3")]
    pub records: Vec<Record>,
}
