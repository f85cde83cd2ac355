//! Provider adapters with a trait-based capability interface.
//!
//! Each bibliographic provider implements [`Provider`], turning its
//! native wire format (flat JSON, nested attribute/value JSON, or one of
//! two XML dialects) into canonical [`Document`](crate::models::Document)
//! records. Adapters are selected through the [`ProviderRegistry`] by
//! [`SourceKind`], not by any inheritance hierarchy.

mod arxiv;
mod openaire;
mod pubmed;
mod registry;
mod scholar;

pub mod mock;

pub use arxiv::ArxivProvider;
pub use mock::MockProvider;
pub use openaire::OpenAireProvider;
pub use pubmed::PubMedProvider;
pub use registry::{ProviderCapabilities, ProviderRegistry};
pub use scholar::ScholarProvider;

use async_trait::async_trait;

use crate::models::{Document, ProviderQuery, ProviderResults, SourceKind};

/// The interface every bibliographic provider adapter implements.
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Which provider this adapter talks to
    fn kind(&self) -> SourceKind;

    /// Describe what this adapter can do
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::SEARCH
    }

    /// Search for documents matching the query
    async fn search(&self, query: &ProviderQuery) -> Result<ProviderResults, ProviderError>;

    /// Narrow single-result search for a specific DOI, in the provider's
    /// own DOI query syntax. The default uses the DOI as a plain query.
    async fn search_doi(&self, doi: &str) -> Result<ProviderResults, ProviderError> {
        self.search(&ProviderQuery::new(doi).max_results(1)).await
    }

    /// Retrieve a single document by its provider-scoped identifier
    async fn get_by_id(&self, _id: &str) -> Result<Document, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}

/// Errors that can occur when talking to a provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The requested operation is not implemented for this provider
    #[error("Operation not implemented for this provider")]
    NotImplemented,

    /// Network or transport error (including timeouts)
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML or JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit response from the provider
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// The provider definitively reported the resource missing
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Any other non-2xx API response
    #[error("API error: {0}")]
    Api(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Classify an HTTP status the way the retry policy expects: 404 is
    /// final, 429 is a rate limit, everything else non-2xx is an API error.
    pub fn from_status(status: reqwest::StatusCode, url: &str) -> Self {
        if status == reqwest::StatusCode::NOT_FOUND {
            ProviderError::NotFound(format!("Resource not found: {}", url))
        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            ProviderError::RateLimit(format!("Rate limit exceeded: {}", url))
        } else {
            ProviderError::Api(format!("HTTP error {}: {}", status.as_u16(), url))
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::DeError> for ProviderError {
    fn from(err: quick_xml::DeError) -> Self {
        ProviderError::Parse(format!("XML: {}", err))
    }
}
