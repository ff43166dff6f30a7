//! Injection of event time and routing tag into application records.

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value as JsonValue};

use crate::config::Config;

/// Adds the configured time and tag fields to each record before encoding.
#[derive(Clone, Debug)]
pub struct FieldInjector {
    include_time_key: bool,
    time_key: String,
    time_format: Option<String>,
    include_tag_key: bool,
    tag_key: String,
}

impl Default for FieldInjector {
    fn default() -> Self {
        Self {
            include_time_key: true,
            time_key: "time".to_string(),
            time_format: None,
            include_tag_key: true,
            tag_key: "tag".to_string(),
        }
    }
}

impl FieldInjector {
    /// Build from a config. An unparseable `time_format` falls back to RFC 3339.
    pub fn from_config(config: &Config) -> Self {
        Self {
            include_time_key: config.include_time_key,
            time_key: config.time_key.clone(),
            time_format: config.time_format.clone(),
            include_tag_key: config.include_tag_key,
            tag_key: config.tag_key.clone(),
        }
    }

    pub fn inject(
        &self,
        tag: &str,
        time: DateTime<Utc>,
        mut record: Map<String, JsonValue>,
    ) -> Map<String, JsonValue> {
        if self.include_time_key {
            record.insert(self.time_key.clone(), JsonValue::String(self.format_time(time)));
        }
        if self.include_tag_key {
            record.insert(self.tag_key.clone(), JsonValue::String(tag.to_string()));
        }
        record
    }

    fn format_time(&self, time: DateTime<Utc>) -> String {
        if let Some(fmt) = &self.time_format {
            // chrono reports bad specifiers as a fmt::Error, which `to_string` turns into a panic
            let mut formatted = String::new();
            if write!(formatted, "{}", time.format(fmt)).is_ok() {
                return formatted;
            }
            tracing::warn!(time_format = %fmt, "invalid time format, using RFC 3339");
        }
        time.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}
