use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecisionError {
    /// No usable credential for the reasoning provider.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Remote call failed, timed out, or returned content outside the decision schema.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("approval log error: {0}")]
    Log(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DecisionError {
    /// Whether this error may terminate the invocation.
    ///
    /// Cache and log failures are recovered where they happen and must never
    /// reach the host as a failed verdict.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DecisionError::Configuration(_) | DecisionError::Provider(_)
        )
    }
}
