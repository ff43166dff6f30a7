use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

use crate::aggregation::governor::check_chunk_limit;
use crate::pipeline::retry::RetryConfig;

pub const DEFAULT_CHUNK_LIMIT: usize = 256 * 1024;

/// Kinesis rejects partition keys longer than this.
pub const MAX_PARTITION_KEY_LEN: usize = 256;

/// Setup-time failures. Any of these refuses to start the output.
#[derive(Debug)]
pub enum ConfigError {
    MissingStreamName,
    InvalidPartitionKey(String),
    ChunkLimitTooLarge { chunk_limit: usize, ceiling: usize },
    InvalidTimeFormat(String),
    IncompleteCredentials,
    InvalidSize(String),
    UnsupportedOption(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingStreamName => write!(f, "stream_name must not be empty"),
            ConfigError::InvalidPartitionKey(msg) => {
                write!(f, "invalid fixed_partition_key: {}", msg)
            }
            ConfigError::ChunkLimitTooLarge {
                chunk_limit,
                ceiling,
            } => write!(
                f,
                "buffer_chunk_limit of {} bytes exceeds the {} byte shard limit; chunks could never be written",
                chunk_limit, ceiling
            ),
            ConfigError::InvalidTimeFormat(fmt) => write!(f, "invalid time_format: {:?}", fmt),
            ConfigError::IncompleteCredentials => {
                write!(f, "aws_key_id and aws_sec_key must be set together")
            }
            ConfigError::InvalidSize(value) => write!(f, "invalid size: {:?}", value),
            ConfigError::UnsupportedOption(key) => {
                write!(f, "{} is not supported by the Kinesis transport", key)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub stream_name: String,
    #[serde(default)]
    pub fixed_partition_key: Option<String>,
    #[serde(
        default = "default_chunk_limit",
        deserialize_with = "deserialize_size"
    )]
    pub buffer_chunk_limit: usize,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    #[serde(default = "default_true")]
    pub include_time_key: bool,
    #[serde(default = "default_time_key")]
    pub time_key: String,
    #[serde(default)]
    pub time_format: Option<String>,
    #[serde(default = "default_true")]
    pub include_tag_key: bool,
    #[serde(default = "default_tag_key")]
    pub tag_key: String,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub debug: bool,
    /// Accepted only so that setting it fails validation instead of being ignored.
    #[serde(default)]
    pub http_proxy: Option<String>,
}

/// Connection and credential settings for the Kinesis client.
#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsConfig {
    /// Falls back to the environment / profile region when unset.
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub aws_key_id: Option<String>,
    #[serde(default)]
    pub aws_sec_key: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub credentials_path: Option<String>,
    #[serde(default)]
    pub role_arn: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl std::fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConfig")
            .field("region", &self.region)
            .field("aws_key_id", &self.aws_key_id)
            .field("aws_sec_key", &self.aws_sec_key.as_ref().map(|_| "<redacted>"))
            .field("profile", &self.profile)
            .field("credentials_path", &self.credentials_path)
            .field("role_arn", &self.role_arn)
            .field("external_id", &self.external_id)
            .finish()
    }
}

/// Where the Kinesis client takes its credentials from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Static { key_id: String, secret: String },
    Profile { name: String, path: Option<String> },
    AssumeRole { role_arn: String, external_id: Option<String> },
    /// Environment, shared config, instance metadata and the rest of the SDK chain.
    DefaultChain,
}

impl AwsConfig {
    /// Static keys win over a profile, which wins over an assumed role.
    pub fn credential_source(&self) -> CredentialSource {
        if let (Some(key_id), Some(secret)) = (&self.aws_key_id, &self.aws_sec_key) {
            return CredentialSource::Static {
                key_id: key_id.clone(),
                secret: secret.clone(),
            };
        }
        if let Some(name) = &self.profile {
            return CredentialSource::Profile {
                name: name.clone(),
                path: self.credentials_path.clone(),
            };
        }
        if let Some(role_arn) = &self.role_arn {
            return CredentialSource::AssumeRole {
                role_arn: role_arn.clone(),
                external_id: self.external_id.clone(),
            };
        }
        CredentialSource::DefaultChain
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::exponential(self.max_attempts, self.base_delay_ms, self.max_delay_ms)
    }
}

fn default_chunk_limit() -> usize {
    DEFAULT_CHUNK_LIMIT
}

fn default_flush_interval_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_time_key() -> String {
    "time".to_string()
}

fn default_tag_key() -> String {
    "tag".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    10_000
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs.max(1))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream_name.trim().is_empty() {
            return Err(ConfigError::MissingStreamName);
        }

        if let Some(key) = &self.fixed_partition_key {
            if key.is_empty() {
                return Err(ConfigError::InvalidPartitionKey("empty".to_string()));
            }
            if key.chars().count() > MAX_PARTITION_KEY_LEN {
                return Err(ConfigError::InvalidPartitionKey(format!(
                    "longer than {} characters",
                    MAX_PARTITION_KEY_LEN
                )));
            }
        }

        check_chunk_limit(self.buffer_chunk_limit)?;

        if let Some(fmt) = &self.time_format {
            if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
                return Err(ConfigError::InvalidTimeFormat(fmt.clone()));
            }
        }

        if self.aws.aws_key_id.is_some() != self.aws.aws_sec_key.is_some() {
            return Err(ConfigError::IncompleteCredentials);
        }

        if self.http_proxy.is_some() {
            return Err(ConfigError::UnsupportedOption("http_proxy"));
        }

        Ok(())
    }
}

pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
    Config::from_toml(&content).with_context(|| format!("Invalid config {}", path.as_ref().display()))
}

/// Parse a byte size such as `512`, `100k`, `8m` or `1g` (binary units).
pub fn parse_size(value: &str) -> Result<usize, ConfigError> {
    let trimmed = value.trim();
    let lower = trimmed.to_ascii_lowercase();
    let (digits, multiplier) = match lower.chars().last() {
        Some('k') => (&lower[..lower.len() - 1], 1024),
        Some('m') => (&lower[..lower.len() - 1], 1024 * 1024),
        Some('g') => (&lower[..lower.len() - 1], 1024 * 1024 * 1024),
        _ => (lower.as_str(), 1),
    };

    digits
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| ConfigError::InvalidSize(trimmed.to_string()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Bytes(u64),
    Text(String),
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match SizeValue::deserialize(deserializer)? {
        SizeValue::Bytes(n) => usize::try_from(n).map_err(serde::de::Error::custom),
        SizeValue::Text(s) => parse_size(&s).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::from_toml(r#"stream_name = "logs""#).unwrap();
        assert_eq!(config.stream_name, "logs");
        assert_eq!(config.fixed_partition_key, None);
        assert_eq!(config.buffer_chunk_limit, DEFAULT_CHUNK_LIMIT);
        assert!(config.include_time_key);
        assert!(config.include_tag_key);
        assert_eq!(config.time_key, "time");
        assert_eq!(config.tag_key, "tag");
        assert_eq!(config.retry.max_attempts, 3);
        assert!(!config.debug);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
stream_name = "test_stream"
fixed_partition_key = "test_partition_key"
buffer_chunk_limit = "100k"
flush_interval_secs = 2
include_time_key = false
tag_key = "route"
time_format = "%s"
debug = true

[aws]
region = "us-east-1"
aws_key_id = "test_key_id"
aws_sec_key = "test_sec_key"

[retry]
max_attempts = 5
"#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.fixed_partition_key.as_deref(), Some("test_partition_key"));
        assert_eq!(config.buffer_chunk_limit, 100 * 1024);
        assert_eq!(config.flush_interval(), Duration::from_secs(2));
        assert!(!config.include_time_key);
        assert_eq!(config.tag_key, "route");
        assert_eq!(config.aws.region.as_deref(), Some("us-east-1"));
        assert_eq!(config.aws.aws_key_id.as_deref(), Some("test_key_id"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 100);
    }

    #[test]
    fn test_parse_profile_credentials() {
        let toml = r#"
stream_name = "test_stream"

[aws]
profile = "default"
credentials_path = "/home/scott/.aws/credentials"
role_arn = "arn:aws:iam::001234567890:role/my-role"
external_id = "my_external_id"
"#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.aws.profile.as_deref(), Some("default"));
        assert_eq!(
            config.aws.credentials_path.as_deref(),
            Some("/home/scott/.aws/credentials")
        );
        assert_eq!(config.aws.external_id.as_deref(), Some("my_external_id"));
    }

    #[test]
    fn test_chunk_limit_of_one_megabyte_is_refused() {
        let err = Config::from_toml(
            r#"
stream_name = "test_stream"
buffer_chunk_limit = "1m"
"#,
        )
        .unwrap_err();
        let err = err.downcast::<ConfigError>().unwrap();
        assert!(matches!(err, ConfigError::ChunkLimitTooLarge { .. }));
    }

    #[test]
    fn test_numeric_chunk_limit() {
        let config = Config::from_toml(
            r#"
stream_name = "s"
buffer_chunk_limit = 4096
"#,
        )
        .unwrap();
        assert_eq!(config.buffer_chunk_limit, 4096);
    }

    #[test]
    fn test_missing_stream_name_fails_to_parse() {
        assert!(Config::from_toml("fixed_partition_key = \"pk\"").is_err());
    }

    #[test]
    fn test_blank_stream_name_refused() {
        let err = Config::from_toml(r#"stream_name = "  ""#).unwrap_err();
        assert!(err.to_string().contains("stream_name"));
    }

    #[test]
    fn test_partition_key_too_long_refused() {
        let toml = format!(
            "stream_name = \"s\"\nfixed_partition_key = \"{}\"",
            "k".repeat(MAX_PARTITION_KEY_LEN + 1)
        );
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn test_half_credentials_refused() {
        let toml = r#"
stream_name = "s"
[aws]
aws_key_id = "only_id"
"#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::IncompleteCredentials)
        ));
    }

    #[test]
    fn test_invalid_time_format_refused() {
        let toml = r#"
stream_name = "s"
time_format = "%Q"
"#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_http_proxy_refused() {
        let err = Config::from_toml(
            r#"
stream_name = "s"
http_proxy = "http://proxy:3128"
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnsupportedOption("http_proxy"))
        ));
    }

    #[test]
    fn test_unknown_keys_refused() {
        let err = Config::from_toml(
            r#"
stream_name = "s"
flush_interval = 5
"#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("flush_interval"));

        let nested = r#"
stream_name = "s"
[aws]
http_proxy = "http://proxy:3128"
"#;
        assert!(Config::from_toml(nested).is_err());

        let retry = r#"
stream_name = "s"
[retry]
attempts = 2
"#;
        assert!(Config::from_toml(retry).is_err());
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let aws = AwsConfig {
            aws_key_id: Some("id".into()),
            aws_sec_key: Some("super-secret".into()),
            ..Default::default()
        };
        let rendered = format!("{:?}", aws);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_credential_source_precedence() {
        let mut aws = AwsConfig {
            aws_key_id: Some("id".into()),
            aws_sec_key: Some("secret".into()),
            profile: Some("default".into()),
            role_arn: Some("arn:aws:iam::001234567890:role/my-role".into()),
            ..Default::default()
        };
        assert!(matches!(aws.credential_source(), CredentialSource::Static { .. }));

        aws.aws_key_id = None;
        aws.aws_sec_key = None;
        assert_eq!(
            aws.credential_source(),
            CredentialSource::Profile {
                name: "default".into(),
                path: None
            }
        );

        aws.profile = None;
        aws.external_id = Some("my_external_id".into());
        assert_eq!(
            aws.credential_source(),
            CredentialSource::AssumeRole {
                role_arn: "arn:aws:iam::001234567890:role/my-role".into(),
                external_id: Some("my_external_id".into()),
            }
        );

        assert_eq!(
            AwsConfig::default().credential_source(),
            CredentialSource::DefaultChain
        );
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("100k").unwrap(), 102_400);
        assert_eq!(parse_size("8M").unwrap(), 8 * 1024 * 1024);
        assert_eq!(parse_size(" 1g ").unwrap(), 1024 * 1024 * 1024);
        assert!(parse_size("k").is_err());
        assert!(parse_size("ten").is_err());
        assert!(parse_size("").is_err());
    }

    #[test]
    fn test_load_config_not_found() {
        let result = load_config_from_path("/nonexistent/kinesis-aggregation.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stream_name = \"from_file\"").unwrap();
        writeln!(file, "fixed_partition_key = \"pk\"").unwrap();

        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(config.stream_name, "from_file");
        assert_eq!(config.fixed_partition_key.as_deref(), Some("pk"));
    }
}
