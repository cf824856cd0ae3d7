//! Queue error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// The queue refused the request; re-sending the same payload will not help.
    #[error("rejected by queue ({code}): {message}")]
    Rejected { code: String, message: String },

    /// Some entries of a batch were not accepted.
    #[error("{failed} of {total} messages failed, first: {first}")]
    PartialFailure {
        failed: usize,
        total: usize,
        first: String,
    },

    #[error("message serialize error: {0}")]
    Serialize(String),

    #[error("provider error: {0}")]
    Provider(String),
}

impl QueueError {
    /// Whether a later attempt with the same payload may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            QueueError::Connection(_)
            | QueueError::Timeout(_)
            | QueueError::PartialFailure { .. }
            | QueueError::Provider(_) => true,
            QueueError::Rejected { .. } | QueueError::Serialize(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(QueueError::Timeout(10_000).is_transient());
        assert!(QueueError::Connection("reset".into()).is_transient());
        assert!(!QueueError::Rejected {
            code: "AccessDenied".into(),
            message: "no".into(),
        }
        .is_transient());
        assert!(!QueueError::Serialize("bad".into()).is_transient());
    }
}
