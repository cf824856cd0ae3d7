//! Queue producer trait and types.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::QueueError;

/// One message handed to the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Entry id, unique within its batch.
    pub id: String,
    /// JSON-serialized record.
    pub body: String,
    /// Ordering group (SQS `MessageGroupId`).
    pub group_id: String,
    /// Deduplication token (SQS `MessageDeduplicationId`).
    pub dedup_id: String,
}

/// A message the queue did not accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub id: String,
    pub code: String,
    pub message: String,
    /// The caller's fault (bad request, permissions); retrying will not help.
    pub sender_fault: bool,
}

impl fmt::Display for FailedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.id, self.code, self.message)
    }
}

/// Per-message outcome of one batch send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSendResponse {
    pub successful: Vec<String>,
    pub failed: Vec<FailedEntry>,
}

impl BatchSendResponse {
    /// Response where every message was accepted.
    pub fn all_ok(messages: &[OutgoingMessage]) -> Self {
        Self {
            successful: messages.iter().map(|m| m.id.clone()).collect(),
            failed: Vec::new(),
        }
    }

    /// Collapse per-message failures into a batch-level result.
    pub fn into_result(self) -> Result<usize, QueueError> {
        let total = self.successful.len() + self.failed.len();
        let Some(first) = self.failed.first() else {
            return Ok(self.successful.len());
        };
        if let Some(fault) = self.failed.iter().find(|f| f.sender_fault) {
            return Err(QueueError::Rejected {
                code: fault.code.clone(),
                message: fault.to_string(),
            });
        }
        Err(QueueError::PartialFailure {
            failed: self.failed.len(),
            total,
            first: first.to_string(),
        })
    }
}

/// Trait for queue producer backends.
///
/// One call sends one batch. Implementations must not split or reorder the
/// messages they are given.
#[async_trait]
pub trait QueueProducer: Send + Sync {
    async fn send_batch(&self, messages: &[OutgoingMessage]) -> Result<BatchSendResponse, QueueError>;

    /// Provider name for logs (e.g. "sqs").
    fn name(&self) -> &str;
}

/// Producer that logs messages instead of sending them (dry runs).
#[derive(Debug, Default)]
pub struct LogProducer;

#[async_trait]
impl QueueProducer for LogProducer {
    async fn send_batch(&self, messages: &[OutgoingMessage]) -> Result<BatchSendResponse, QueueError> {
        for m in messages {
            info!(
                id = %m.id,
                group_id = %m.group_id,
                dedup_id = %m.dedup_id,
                body = %m.body,
                "dry-run message"
            );
        }
        Ok(BatchSendResponse::all_ok(messages))
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(id: &str, sender_fault: bool) -> FailedEntry {
        FailedEntry {
            id: id.to_string(),
            code: if sender_fault { "AccessDenied" } else { "InternalError" }.to_string(),
            message: "nope".to_string(),
            sender_fault,
        }
    }

    #[test]
    fn test_all_successful_is_ok() {
        let resp = BatchSendResponse {
            successful: vec!["a".into(), "b".into()],
            failed: vec![],
        };
        assert_eq!(resp.into_result().unwrap(), 2);
    }

    #[test]
    fn test_server_side_failure_is_partial_and_transient() {
        let resp = BatchSendResponse {
            successful: vec!["a".into()],
            failed: vec![failed("b", false)],
        };
        let err = resp.into_result().unwrap_err();
        assert!(matches!(err, QueueError::PartialFailure { failed: 1, total: 2, .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_sender_fault_is_rejected() {
        let resp = BatchSendResponse {
            successful: vec![],
            failed: vec![failed("a", false), failed("b", true)],
        };
        let err = resp.into_result().unwrap_err();
        assert!(matches!(err, QueueError::Rejected { ref code, .. } if code == "AccessDenied"));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_log_producer_accepts_everything() {
        let messages = vec![OutgoingMessage {
            id: "tender_message_0_0".into(),
            body: "{}".into(),
            group_id: "g".into(),
            dedup_id: "d".into(),
        }];
        let resp = LogProducer.send_batch(&messages).await.unwrap();
        assert_eq!(resp.successful, vec!["tender_message_0_0".to_string()]);
        assert_eq!(LogProducer.name(), "log");
    }
}
