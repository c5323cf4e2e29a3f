use hookgate_core::DecisionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no reasoning provider configured: {0}")]
    Configuration(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("LLM API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("response did not match the decision schema: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<LlmError> for DecisionError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Configuration(msg) => DecisionError::Configuration(msg),
            other => DecisionError::Provider(other.to_string()),
        }
    }
}
