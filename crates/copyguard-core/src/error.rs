//! CopyGuard error types.

use std::time::Duration;

/// Every fallible operation in the workspace returns this error.
#[derive(Debug, thiserror::Error)]
pub enum CopyGuardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Knowledge base is not initialized")]
    KnowledgeBaseUninitialized,

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("API key missing for provider: {0}")]
    ApiKeyMissing(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{label} timed out after {elapsed:?}")]
    Timeout { label: String, elapsed: Duration },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl CopyGuardError {
    /// Remote-service failures that review code may degrade instead of raising.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Provider(_) | Self::Http(_) | Self::Timeout { .. } | Self::ApiKeyMissing(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CopyGuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CopyGuardError::Provider("500".into()).is_transient());
        assert!(CopyGuardError::Http("refused".into()).is_transient());
        assert!(
            CopyGuardError::Timeout {
                label: "complete".into(),
                elapsed: Duration::from_secs(1),
            }
            .is_transient()
        );
        assert!(!CopyGuardError::DimensionMismatch { expected: 8, actual: 4 }.is_transient());
        assert!(!CopyGuardError::KnowledgeBaseUninitialized.is_transient());
        assert!(!CopyGuardError::EmptyInput("no blocks".into()).is_transient());
    }

    #[test]
    fn test_display() {
        let err = CopyGuardError::DimensionMismatch { expected: 384, actual: 1536 };
        assert_eq!(
            err.to_string(),
            "Embedding dimension mismatch: expected 384, got 1536"
        );
    }
}
