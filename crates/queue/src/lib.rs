pub mod batcher;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod producer;
pub mod sqs;

#[cfg(test)]
mod fixtures;

pub use batcher::partition;
pub use dispatcher::{BatchOutcome, BatchStatus, DeliveryReport, Dispatcher, FailureReason, RetryPolicy};
pub use error::QueueError;
pub use message::{encode_batch, encode_record};
pub use producer::{BatchSendResponse, FailedEntry, LogProducer, OutgoingMessage, QueueProducer};
pub use sqs::SqsProducer;
