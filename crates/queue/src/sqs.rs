//! AWS SQS FIFO producer implementation.

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_sqs::config::BehaviorVersion;
use aws_sdk_sqs::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_sqs::operation::send_message_batch::SendMessageBatchError;
use aws_sdk_sqs::types::SendMessageBatchRequestEntry;
use aws_sdk_sqs::Client;
use tracing::{debug, info};

use tender_core::config::{AwsConfig, QueueConfig};
use tender_core::ConfigError;

use crate::error::QueueError;
use crate::producer::{BatchSendResponse, FailedEntry, OutgoingMessage, QueueProducer};

/// Error codes that mean the request itself is wrong.
const SENDER_FAULT_CODES: &[&str] = &[
    "AccessDenied",
    "AWS.SimpleQueueService.NonExistentQueue",
    "QueueDoesNotExist",
    "InvalidParameterValue",
    "InvalidAddress",
    "InvalidSecurity",
    "InvalidClientTokenId",
    "UnsupportedOperation",
    "AWS.SimpleQueueService.TooManyEntriesInBatchRequest",
    "AWS.SimpleQueueService.BatchRequestTooLong",
    "AWS.SimpleQueueService.BatchEntryIdsNotDistinct",
    "AWS.SimpleQueueService.EmptyBatchRequest",
    "AWS.SimpleQueueService.InvalidBatchEntryId",
];

/// SQS-backed queue producer.
pub struct SqsProducer {
    client: Client,
    queue_url: String,
}

impl SqsProducer {
    /// Create a new SQS producer from project config.
    pub async fn new(aws: &AwsConfig, queue: &QueueConfig) -> Result<Self, ConfigError> {
        let queue_url = queue
            .queue_url
            .clone()
            .ok_or_else(|| ConfigError::Missing("QUEUE_URL".to_string()))?;
        let region = aws_sdk_sqs::config::Region::new(aws.region.clone());

        // Build the SQS config directly rather than from aws_config::defaults()
        // so AWS_ENDPOINT_URL meant for another service is never picked up.
        let mut sqs_config = aws_sdk_sqs::Config::builder()
            .region(region.clone())
            .behavior_version(BehaviorVersion::latest());

        if let (Some(key_id), Some(secret)) = (&aws.access_key_id, &aws.secret_access_key) {
            let creds = Credentials::new(
                key_id,
                secret,
                aws.session_token.clone(),
                None,
                "tender-queue-static",
            );
            sqs_config = sqs_config.credentials_provider(creds);
        } else {
            // Fall back to the default chain (instance role, profile, SSO).
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .load()
                .await;
            sqs_config.set_credentials_provider(shared.credentials_provider());
        }

        // Only apply endpoint override if QUEUE_AWS_ENDPOINT_URL is explicitly set.
        if let Some(ref endpoint) = aws.endpoint_url {
            let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                endpoint.clone()
            } else {
                format!("https://{endpoint}")
            };
            sqs_config = sqs_config.endpoint_url(&url);
        }

        let client = Client::from_conf(sqs_config.build());

        info!(
            queue_url = %queue_url,
            region = %aws.region,
            "SQS producer initialized"
        );

        Ok(Self { client, queue_url })
    }
}

#[async_trait]
impl QueueProducer for SqsProducer {
    async fn send_batch(&self, messages: &[OutgoingMessage]) -> Result<BatchSendResponse, QueueError> {
        let entries = messages
            .iter()
            .map(|m| {
                SendMessageBatchRequestEntry::builder()
                    .id(&m.id)
                    .message_body(&m.body)
                    .message_group_id(&m.group_id)
                    .message_deduplication_id(&m.dedup_id)
                    .build()
                    .map_err(|e| QueueError::Serialize(format!("entry {}: {e}", m.id)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = entries.len(), "Sending SQS batch");

        let resp = self
            .client
            .send_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(classify_send_error)?;

        let successful = resp
            .successful()
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        let failed = resp
            .failed()
            .iter()
            .map(|f| FailedEntry {
                id: f.id().to_string(),
                code: f.code().to_string(),
                message: f.message().unwrap_or_default().to_string(),
                sender_fault: f.sender_fault(),
            })
            .collect();

        Ok(BatchSendResponse { successful, failed })
    }

    fn name(&self) -> &str {
        "sqs"
    }
}

fn classify_send_error<R: std::fmt::Debug>(err: SdkError<SendMessageBatchError, R>) -> QueueError {
    match &err {
        SdkError::ServiceError(service) => {
            let code = service.err().code().unwrap_or("Unknown").to_string();
            let message = service.err().message().unwrap_or_default().to_string();
            if is_sender_fault(&code) {
                QueueError::Rejected { code, message }
            } else {
                QueueError::Provider(format!("{code}: {message}"))
            }
        }
        SdkError::TimeoutError(_) => QueueError::Connection("SQS request timed out".to_string()),
        _ => QueueError::Connection(format!("SQS send_message_batch failed: {err:?}")),
    }
}

fn is_sender_fault(code: &str) -> bool {
    SENDER_FAULT_CODES.contains(&code)
}
