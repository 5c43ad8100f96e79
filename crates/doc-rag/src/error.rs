//! Error types for the retrieval pipeline

use std::time::Duration;
use thiserror::Error;

/// Boxed cause carried by upstream failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
///
/// Every error is scoped to the operation that raised it; none of them
/// leaves the index or the engine in an unusable state.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or empty input (empty document, zero chunk size, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Embedding length does not match the index dimensionality
    #[error("Dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Query issued against an index holding no nodes
    #[error("Vector index is empty")]
    EmptyIndex,

    /// Embedding or completion service failure
    #[error("Upstream service '{service}' failed: {source}")]
    Upstream {
        service: String,
        #[source]
        source: BoxError,
    },

    /// Bounded wait on an upstream call expired
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Text extraction error
    #[error("Failed to extract '{locator}': {message}")]
    Extraction { locator: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Non-success HTTP response from an upstream service
#[derive(Debug, Error)]
#[error("{operation} failed: HTTP {status} - {body}")]
pub struct HttpStatusError {
    /// What the request was for ("Embedding", "Generation", ...)
    pub operation: &'static str,
    /// Response status code
    pub status: u16,
    /// Response body, possibly empty
    pub body: String,
}

impl HttpStatusError {
    /// Client errors other than 429 fail the same way on every attempt
    pub fn is_retryable(&self) -> bool {
        !(400..500).contains(&self.status) || self.status == 429
    }
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an upstream error wrapping the underlying cause
    pub fn upstream(service: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Upstream {
            service: service.into(),
            source: source.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an extraction error
    pub fn extraction(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// Whether repeating the failed request could succeed.
    ///
    /// Upstream failures and timeouts are retryable unless the service
    /// rejected the request with a client error status.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { source, .. } => source
                .downcast_ref::<HttpStatusError>()
                .map_or(true, HttpStatusError::is_retryable),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Wrap a provider failure as an upstream error.
    ///
    /// Errors that already describe an upstream failure or a timeout pass
    /// through unchanged.
    pub fn into_upstream(self, service: &str) -> Self {
        match self {
            Self::Upstream { .. } | Self::Timeout { .. } => self,
            other => Self::upstream(service, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_upstream_keeps_cause() {
        let err = Error::upstream("embedding", "connection refused");
        assert!(err.to_string().contains("embedding"));
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_into_upstream_wraps_once() {
        let wrapped = Error::invalid_input("bad").into_upstream("llm");
        assert!(matches!(wrapped, Error::Upstream { ref service, .. } if service == "llm"));

        let again = wrapped.into_upstream("other");
        assert!(matches!(again, Error::Upstream { ref service, .. } if service == "llm"));

        let timeout = Error::timeout("embed", Duration::from_secs(1)).into_upstream("llm");
        assert!(matches!(timeout, Error::Timeout { .. }));
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        let status = |status| {
            Error::upstream(
                "openai",
                HttpStatusError {
                    operation: "Embedding",
                    status,
                    body: String::new(),
                },
            )
        };

        assert!(!status(401).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(Error::upstream("ollama", "connection refused").is_retryable());
        assert!(!Error::invalid_input("bad").is_retryable());
        assert!(status(401).to_string().contains("HTTP 401"));
    }
}
