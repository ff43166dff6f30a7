//! Kinesis client implementing RecordSender.

use aws_config::sts::AssumeRoleProvider;
use aws_config::{AppName, BehaviorVersion};
use aws_sdk_kinesis::config::http::HttpResponse;
use aws_sdk_kinesis::config::{Credentials, Region};
use aws_sdk_kinesis::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_kinesis::operation::put_record::PutRecordError;
use aws_sdk_kinesis::primitives::Blob;
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{AwsConfig, CredentialSource};
use crate::pipeline::{RecordSender, SendError};

/// Identifies this output in the SDK user agent.
const APP_NAME: &str = "kinesis-aggregation";

const ROLE_SESSION_NAME: &str = "kinesis-aggregation";

const ROLE_SESSION_LENGTH: Duration = Duration::from_secs(60 * 60);

/// Build a Kinesis client from the configured region and credential source.
pub async fn load_client(aws: &AwsConfig) -> aws_sdk_kinesis::Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Ok(app_name) = AppName::new(APP_NAME) {
        loader = loader.app_name(app_name);
    }
    if let Some(region) = &aws.region {
        loader = loader.region(Region::new(region.clone()));
    }

    let source = aws.credential_source();
    match &source {
        CredentialSource::Static { key_id, secret } => {
            loader = loader.credentials_provider(Credentials::new(
                key_id.clone(),
                secret.clone(),
                None,
                None,
                "kinesis-aggregation-static",
            ));
        }
        CredentialSource::Profile { name, path } => {
            loader = loader.profile_name(name);
            if let Some(path) = path {
                use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
                let files = ProfileFiles::builder()
                    .include_default_config_file(true)
                    .with_file(ProfileFileKind::Credentials, path)
                    .build();
                loader = loader.profile_files(files);
            }
        }
        CredentialSource::AssumeRole { .. } | CredentialSource::DefaultChain => {}
    }

    let sdk_config = loader.load().await;

    let client = if let CredentialSource::AssumeRole {
        role_arn,
        external_id,
    } = &source
    {
        let mut builder = AssumeRoleProvider::builder(role_arn.clone())
            .session_name(ROLE_SESSION_NAME)
            .session_length(ROLE_SESSION_LENGTH)
            .configure(&sdk_config);
        if let Some(external_id) = external_id {
            builder = builder.external_id(external_id.clone());
        }
        let provider = builder.build().await;

        let config = aws_sdk_kinesis::config::Builder::from(&sdk_config)
            .credentials_provider(provider)
            .build();
        aws_sdk_kinesis::Client::from_conf(config)
    } else {
        aws_sdk_kinesis::Client::new(&sdk_config)
    };

    info!(
        credentials = credential_label(&source),
        region = ?sdk_config.region().map(|r| r.as_ref().to_string()),
        "Kinesis client initialized"
    );
    client
}

fn credential_label(source: &CredentialSource) -> &'static str {
    match source {
        CredentialSource::Static { .. } => "static",
        CredentialSource::Profile { .. } => "profile",
        CredentialSource::AssumeRole { .. } => "assume_role",
        CredentialSource::DefaultChain => "default_chain",
    }
}

/// Sends aggregated records with PutRecord.
pub struct KinesisSender {
    client: aws_sdk_kinesis::Client,
}

impl KinesisSender {
    pub fn new(client: aws_sdk_kinesis::Client) -> Self {
        Self { client }
    }

    pub async fn from_config(aws: &AwsConfig) -> Self {
        Self::new(load_client(aws).await)
    }
}

#[async_trait::async_trait]
impl RecordSender for KinesisSender {
    async fn put_record(
        &self,
        stream_name: &str,
        data: Bytes,
        partition_key: &str,
    ) -> Result<(), SendError> {
        let output = self
            .client
            .put_record()
            .stream_name(stream_name)
            .partition_key(partition_key)
            .data(Blob::new(data.to_vec()))
            .send()
            .await
            .map_err(classify_error)?;

        debug!(
            shard_id = %output.shard_id(),
            sequence_number = %output.sequence_number(),
            "put_record accepted"
        );
        Ok(())
    }
}

/// Map SDK failures onto retryable / permanent send errors.
fn classify_error(err: SdkError<PutRecordError, HttpResponse>) -> SendError {
    match err {
        SdkError::TimeoutError(_) => SendError::Timeout,
        SdkError::DispatchFailure(e) => SendError::Network(format!("{:?}", e)),
        // Truncated or garbled responses can come from a dropped connection.
        SdkError::ResponseError(e) => SendError::Network(format!("{:?}", e)),
        // The request could not be built; the same input fails the same way.
        SdkError::ConstructionFailure(e) => SendError::Rejected(format!("{:?}", e)),
        SdkError::ServiceError(ctx) => {
            let status = ctx.raw().status().as_u16();
            let e = ctx.err();
            SendError::from_service_response(e.code(), status, e.to_string())
        }
        other => SendError::Network(format!("{:?}", other)),
    }
}
