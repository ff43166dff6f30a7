//! Amazon Kinesis Data Streams transport.

pub mod client;

pub use client::{load_client, KinesisSender};
