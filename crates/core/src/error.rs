use chrono::NaiveDateTime;
use thiserror::Error;

/// Why a raw source item could not become a [`crate::TenderRecord`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("unknown source tag: {0:?}")]
    UnknownSource(String),

    #[error("invalid {field}: {value:?} is not a source date-time")]
    InvalidDate { field: &'static str, value: String },

    #[error("closing date {closing} precedes published date {published}")]
    DateOrder {
        published: NaiveDateTime,
        closing: NaiveDateTime,
    },

    #[error("invalid supporting document {name:?}: {reason}")]
    InvalidDocumentUrl { name: String, reason: String },

    #[error("malformed item: {0}")]
    Malformed(String),
}

/// Startup configuration failures. Always fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(String),

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}
