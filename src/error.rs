//! Request-level error taxonomy.
//!
//! Every failure that can cross the dispatcher boundary is one of these
//! variants; the dispatcher maps each to a stable JSON-RPC error code.

use thiserror::Error;

/// Errors surfaced to callers of the aggregator and dispatcher.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Missing or invalid credentials/settings
    #[error("{0}")]
    Configuration(String),

    /// Malformed request parameters
    #[error("{0}")]
    Validation(String),

    /// An upstream provider call failed
    #[error("{0}")]
    Api(String),

    /// A lookup exhausted all providers without a hit
    #[error("{0}")]
    NotFound(String),

    /// Rate limit exceeded. Modeled for the error-code table; adapters
    /// retry 429s and surface exhaustion as [`RetrievalError::Api`], so
    /// this variant is currently never constructed by the core.
    #[error("{0}")]
    RateLimit(String),

    /// Anything the taxonomy does not classify
    #[error("{0}")]
    Internal(String),
}

impl From<serde_json::Error> for RetrievalError {
    fn from(err: serde_json::Error) -> Self {
        RetrievalError::Internal(format!("JSON: {}", err))
    }
}
