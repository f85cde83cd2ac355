//! Open-access PDF resolution via the Unpaywall API.
//!
//! Best-effort secondary enrichment: given a DOI, return a free PDF
//! location if one is known. Failures are swallowed and reported as
//! "unavailable" so resolution can never fail a parent request.
//! Outcomes are memoized per DOI in a bounded cache for the process
//! lifetime, since the same DOI is often resolved repeatedly within and
//! across requests.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_CACHE_CAPACITY;
use crate::providers::ProviderError;
use crate::utils::{with_retry, BoundedCache, HttpClient, RetryConfig};

const UNPAYWALL_API_URL: &str = "https://api.unpaywall.org/v2";

/// Outcome of resolving a DOI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfResolution {
    /// Whether a freely accessible copy was located
    pub pdf_available: bool,

    /// Direct PDF link, or the landing page when no direct link exists
    pub pdf_url: Option<String>,

    /// Open-access classification reported by the lookup
    pub oa_status: Option<String>,

    /// Repository or institution hosting the copy
    pub source: Option<String>,
}

impl PdfResolution {
    fn unavailable(oa_status: Option<String>) -> Self {
        Self {
            pdf_available: false,
            pdf_url: None,
            oa_status,
            source: None,
        }
    }
}

/// Unpaywall-backed resolver with a process-lifetime memo table.
#[derive(Debug)]
pub struct PdfResolver {
    client: HttpClient,
    email: String,
    base_url: String,
    retry: RetryConfig,
    memo: Mutex<BoundedCache<String, PdfResolution>>,
}

impl PdfResolver {
    pub fn new(client: HttpClient, email: String) -> Self {
        Self {
            client,
            email,
            base_url: UNPAYWALL_API_URL.to_string(),
            retry: RetryConfig::default(),
            memo: Mutex::new(BoundedCache::new(DEFAULT_CACHE_CAPACITY)),
        }
    }

    /// Point the resolver at a different endpoint (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.memo = Mutex::new(BoundedCache::new(capacity));
        self
    }

    /// Resolve a DOI to a best-effort open-access PDF location.
    ///
    /// An empty DOI resolves to "unavailable" without a network call.
    pub async fn resolve(&self, doi: &str) -> PdfResolution {
        if doi.is_empty() {
            return PdfResolution::unavailable(None);
        }

        if let Some(cached) = self.memo.lock().unwrap().get(&doi.to_string()) {
            tracing::debug!(doi, "PDF resolution memo hit");
            return cached.clone();
        }

        let resolution = match self.lookup(doi).await {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::warn!(doi, error = %e, "PDF resolution failed");
                PdfResolution::unavailable(None)
            }
        };

        self.memo
            .lock()
            .unwrap()
            .insert(doi.to_string(), resolution.clone());

        resolution
    }

    async fn lookup(&self, doi: &str) -> Result<PdfResolution, ProviderError> {
        let url = format!(
            "{}/{}?email={}",
            self.base_url,
            doi,
            urlencoding::encode(&self.email)
        );

        let client = self.client.clone();
        let url_for_retry = url.clone();

        let data: UnpaywallResponse = with_retry(self.retry, || {
            let client = client.clone();
            let url = url_for_retry.clone();
            async move {
                let response = client.get(&url).send().await.map_err(|e| {
                    ProviderError::Network(format!("Unpaywall request failed: {}", e))
                })?;

                if !response.status().is_success() {
                    return Err(ProviderError::from_status(response.status(), &url));
                }

                response.json().await.map_err(|e| {
                    ProviderError::Parse(format!("Failed to parse Unpaywall response: {}", e))
                })
            }
        })
        .await?;

        let oa_status = data.oa_status;

        if let Some(location) = data.best_oa_location {
            // Prefer a direct PDF link; the landing page still counts as
            // an available copy.
            let pdf_url = location.url_for_pdf.or(location.url);
            if let Some(pdf_url) = pdf_url {
                return Ok(PdfResolution {
                    pdf_available: true,
                    pdf_url: Some(pdf_url),
                    oa_status,
                    source: location
                        .repository_institution
                        .or_else(|| Some("unpaywall".to_string())),
                });
            }
        }

        Ok(PdfResolution::unavailable(oa_status))
    }
}

/// Unpaywall API response
#[derive(Debug, Deserialize)]
struct UnpaywallResponse {
    oa_status: Option<String>,
    best_oa_location: Option<UnpaywallLocation>,
}

#[derive(Debug, Deserialize)]
struct UnpaywallLocation {
    url_for_pdf: Option<String>,
    url: Option<String>,
    repository_institution: Option<String>,
}
