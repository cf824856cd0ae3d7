//! Ordered, partial-failure-tolerant delivery of record batches.
//!
//! The [`Dispatcher`] sends batches one after another under a single ordering
//! group, so the FIFO queue keeps them in send order. Each batch is retried
//! on its own with exponential backoff; a failed batch never blocks or rolls
//! back the others. A run-level deadline bounds the whole operation and any
//! batch still undelivered when it passes is reported as failed.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use tender_core::config::QueueConfig;
use tender_core::TenderRecord;

use crate::error::QueueError;
use crate::message::encode_batch;
use crate::producer::QueueProducer;

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Bounded exponential backoff for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total sends allowed per batch, first attempt included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound on each send call.
    pub send_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(queue: &QueueConfig) -> Self {
        Self {
            max_attempts: queue.max_attempts.max(1),
            base_delay: Duration::from_millis(queue.backoff_base_ms),
            max_delay: Duration::from_millis(queue.backoff_max_ms),
            send_timeout: queue.send_timeout(),
        }
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            send_timeout: Duration::from_secs(10),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Why a batch was not delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The queue refused the batch; not retried.
    Rejected(String),
    /// Every allowed attempt failed; holds the last error.
    RetriesExhausted(String),
    /// The run-level deadline passed before the batch was delivered.
    DeadlineExceeded,
    /// A record could not be encoded.
    Encode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchStatus {
    Sent,
    Failed { reason: FailureReason },
}

/// Delivery outcome of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub index: usize,
    pub size: usize,
    pub attempts: u32,
    #[serde(flatten)]
    pub status: BatchStatus,
}

impl BatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self.status, BatchStatus::Sent)
    }

    fn failed(index: usize, size: usize, attempts: u32, reason: FailureReason) -> Self {
        Self {
            index,
            size,
            attempts,
            status: BatchStatus::Failed { reason },
        }
    }
}

/// Result of [`Dispatcher::send_all`], one entry per batch in send order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub group_id: String,
    pub batches: Vec<BatchOutcome>,
}

impl DeliveryReport {
    pub fn sent(&self) -> usize {
        self.batches.iter().filter(|b| b.is_sent()).count()
    }

    pub fn failed(&self) -> usize {
        self.batches.len() - self.sent()
    }

    pub fn messages_sent(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| b.is_sent())
            .map(|b| b.size)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Sends record batches to a [`QueueProducer`] under one ordering group.
pub struct Dispatcher {
    producer: Arc<dyn QueueProducer>,
    group_id: String,
    policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(producer: Arc<dyn QueueProducer>, group_id: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            producer,
            group_id: group_id.into(),
            policy,
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Deliver every batch in order, giving up on whatever is left at `deadline`.
    pub async fn send_all(&self, batches: Vec<Vec<TenderRecord>>, deadline: Instant) -> DeliveryReport {
        info!(
            batches = batches.len(),
            group_id = %self.group_id,
            producer = self.producer.name(),
            "Dispatching batches"
        );

        let mut outcomes = Vec::with_capacity(batches.len());
        for (index, batch) in batches.iter().enumerate() {
            let outcome = self.send_one(index, batch, deadline).await;
            match &outcome.status {
                BatchStatus::Sent => info!(
                    batch = index,
                    size = outcome.size,
                    attempts = outcome.attempts,
                    "Batch delivered"
                ),
                BatchStatus::Failed { reason } => warn!(
                    batch = index,
                    size = outcome.size,
                    attempts = outcome.attempts,
                    reason = ?reason,
                    "Batch not delivered"
                ),
            }
            outcomes.push(outcome);
        }

        let report = DeliveryReport {
            group_id: self.group_id.clone(),
            batches: outcomes,
        };
        info!(
            sent = report.sent(),
            failed = report.failed(),
            messages = report.messages_sent(),
            "Dispatch complete"
        );
        report
    }

    async fn send_one(&self, index: usize, batch: &[TenderRecord], deadline: Instant) -> BatchOutcome {
        let size = batch.len();
        let messages = match encode_batch(index, batch, &self.group_id) {
            Ok(m) => m,
            Err(e) => return BatchOutcome::failed(index, size, 0, FailureReason::Encode(e.to_string())),
        };

        let mut attempts = 0u32;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return BatchOutcome::failed(index, size, attempts, FailureReason::DeadlineExceeded);
            }

            attempts += 1;
            let budget = self.policy.send_timeout.min(remaining);
            debug!(batch = index, attempt = attempts, timeout_ms = budget.as_millis() as u64, "Sending batch");

            let result = match timeout(budget, self.producer.send_batch(&messages)).await {
                Ok(sent) => sent.and_then(|resp| resp.into_result()),
                Err(_) => Err(QueueError::Timeout(budget.as_millis() as u64)),
            };

            let err = match result {
                Ok(_) => {
                    return BatchOutcome {
                        index,
                        size,
                        attempts,
                        status: BatchStatus::Sent,
                    }
                }
                Err(e) => e,
            };

            if !err.is_transient() {
                return BatchOutcome::failed(index, size, attempts, FailureReason::Rejected(err.to_string()));
            }
            if attempts >= self.policy.max_attempts {
                return BatchOutcome::failed(
                    index,
                    size,
                    attempts,
                    FailureReason::RetriesExhausted(err.to_string()),
                );
            }

            let delay = self.policy.backoff(attempts) + jitter();
            // The remaining time goes to the batches after this one.
            if Instant::now() + delay >= deadline {
                warn!(
                    batch = index,
                    attempt = attempts,
                    error = %err,
                    "Batch send failed, no time left to retry"
                );
                return BatchOutcome::failed(index, size, attempts, FailureReason::DeadlineExceeded);
            }
            warn!(
                batch = index,
                attempt = attempts,
                error = %err,
                retry_in_ms = delay.as_millis() as u64,
                "Batch send failed, retrying"
            );
            sleep(delay).await;
        }
    }
}

/// Up to 100ms of jitter without a rand dependency: nanosecond fraction of now.
fn jitter() -> Duration {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    Duration::from_millis(u64::from(nanos % 100))
}
