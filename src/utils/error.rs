use thiserror::Error;

/// Failure of a network-backed operation. The store performs no retries and
/// no translation; whatever the remote surfaces is passed through.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}
