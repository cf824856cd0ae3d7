use thiserror::Error;

/// Failure to obtain one page from the source API. Ends pagination.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("source API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response is not valid JSON: {0}")]
    Decode(String),

    #[error("malformed page envelope: {0}")]
    MalformedEnvelope(String),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}
