#![allow(dead_code)] // Test helpers appear unused when compiled independently

use bytes::Bytes;
use kinesis_aggregation::aggregation::frame::{DIGEST_LEN, MAGIC};
use kinesis_aggregation::aggregation::model::AggregatedRecord;
use kinesis_aggregation::{RecordSender, SendError};
use prost::Message;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A put_record call captured by [`MockSender`].
#[derive(Clone, Debug)]
pub struct PutRecordCall {
    pub stream_name: String,
    pub data: Bytes,
    pub partition_key: String,
}

/// Records every call and replays queued failures before succeeding.
#[derive(Default)]
pub struct MockSender {
    calls: Mutex<Vec<PutRecordCall>>,
    failures: Mutex<VecDeque<SendError>>,
}

impl MockSender {
    pub fn failing_with(failures: Vec<SendError>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(failures.into()),
        }
    }

    pub fn calls(&self) -> Vec<PutRecordCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RecordSender for MockSender {
    async fn put_record(
        &self,
        stream_name: &str,
        data: Bytes,
        partition_key: &str,
    ) -> Result<(), SendError> {
        self.calls.lock().unwrap().push(PutRecordCall {
            stream_name: stream_name.to_string(),
            data,
            partition_key: partition_key.to_string(),
        });
        let next = self.failures.lock().unwrap().pop_front();
        match next {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Strip magic marker and digest from a frame, checking the marker.
pub fn frame_payload(frame: &[u8]) -> &[u8] {
    assert!(frame.len() >= MAGIC.len() + DIGEST_LEN, "frame too short");
    assert_eq!(&frame[..MAGIC.len()], &MAGIC, "missing magic marker");
    &frame[MAGIC.len()..frame.len() - DIGEST_LEN]
}

/// Decode a frame the way a KPL-aware consumer would.
pub fn decode_frame(frame: &[u8]) -> AggregatedRecord {
    AggregatedRecord::decode(frame_payload(frame)).expect("payload decodes as AggregatedRecord")
}

pub fn object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected JSON object, got {}", other),
    }
}
