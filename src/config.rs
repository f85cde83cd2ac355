//! Configuration management.
//!
//! The core never reads the environment itself: callers build a [`Config`]
//! (for the bundled binary, via [`Config::from_env`]) and hand it to the
//! aggregator, which validates it on construction.

use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// Default capacity of the DOI -> PDF resolution memo table.
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Application configuration: provider credentials plus numeric tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Academic search engine (SerpAPI Google Scholar) settings
    #[serde(default)]
    pub scholar: Option<ScholarConfig>,

    /// Citation database (PubMed/NCBI E-utilities) settings
    #[serde(default)]
    pub pubmed: Option<PubMedConfig>,

    /// Open-access PDF resolution (Unpaywall) settings
    #[serde(default)]
    pub unpaywall: Option<UnpaywallConfig>,

    /// Numeric tuning values
    #[serde(default)]
    pub tuning: TuningConfig,
}

/// SerpAPI credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScholarConfig {
    /// SerpAPI authentication key (required when the provider is configured)
    pub api_key: String,

    /// Base URL for the SerpAPI endpoint
    #[serde(default = "default_scholar_base_url")]
    pub base_url: String,
}

/// NCBI E-utilities identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubMedConfig {
    /// Contact email, required by NCBI for rate limiting
    pub email: String,

    /// Optional NCBI API key for higher rate limits
    #[serde(default)]
    pub api_key: Option<String>,

    /// Tool name reported to NCBI
    #[serde(default = "default_pubmed_tool")]
    pub tool: String,
}

/// Unpaywall identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnpaywallConfig {
    /// Contact email for the Unpaywall API
    pub email: String,
}

/// Numeric tuning values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Capacity of the PDF-resolution memo table
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Maximum concurrent outbound requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,

    /// Default result limit when a request does not specify one
    #[serde(default = "default_search_limit")]
    pub default_search_limit: usize,

    /// Per-call network timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            max_concurrent_requests: default_max_concurrent(),
            default_search_limit: default_search_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_scholar_base_url() -> String {
    "https://serpapi.com/search".to_string()
}

fn default_pubmed_tool() -> String {
    "scholar-search".to_string()
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_max_concurrent() -> usize {
    10
}

fn default_search_limit() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Validate credential invariants.
    ///
    /// At least one provider block must be present, and each present
    /// block must carry its required identity.
    pub fn validate(&self) -> Result<(), RetrievalError> {
        if self.scholar.is_none() && self.pubmed.is_none() && self.unpaywall.is_none() {
            return Err(RetrievalError::Configuration(
                "at least one API configuration is required".to_string(),
            ));
        }

        if let Some(scholar) = &self.scholar {
            if scholar.api_key.is_empty() {
                return Err(RetrievalError::Configuration(
                    "SerpAPI API key is required if SerpAPI is configured".to_string(),
                ));
            }
        }

        if let Some(pubmed) = &self.pubmed {
            if pubmed.email.is_empty() {
                return Err(RetrievalError::Configuration(
                    "email is required for PubMed/NCBI E-utilities".to_string(),
                ));
            }
        }

        if let Some(unpaywall) = &self.unpaywall {
            if unpaywall.email.is_empty() && self.resolver_email().is_none() {
                return Err(RetrievalError::Configuration(
                    "email is required for the Unpaywall API".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// The identity used for PDF resolution: the Unpaywall email, falling
    /// back to the PubMed email when unset.
    pub fn resolver_email(&self) -> Option<String> {
        self.unpaywall
            .as_ref()
            .map(|u| u.email.clone())
            .filter(|e| !e.is_empty())
            .or_else(|| {
                self.pubmed
                    .as_ref()
                    .map(|p| p.email.clone())
                    .filter(|e| !e.is_empty())
            })
    }

    /// Build a configuration from environment variables.
    ///
    /// This is the collaborator-side bridge used by the binary; library
    /// consumers construct [`Config`] directly.
    pub fn from_env() -> Self {
        let scholar = std::env::var("SERP_API_KEY").ok().map(|api_key| ScholarConfig {
            api_key,
            base_url: std::env::var("SERP_API_BASE_URL")
                .unwrap_or_else(|_| default_scholar_base_url()),
        });

        let pubmed = std::env::var("PUBMED_EMAIL").ok().map(|email| PubMedConfig {
            email,
            api_key: std::env::var("PUBMED_API_KEY").ok().filter(|k| !k.is_empty()),
            tool: std::env::var("PUBMED_TOOL").unwrap_or_else(|_| default_pubmed_tool()),
        });

        let unpaywall = std::env::var("UNPAYWALL_EMAIL")
            .ok()
            .map(|email| UnpaywallConfig { email });

        let tuning = TuningConfig {
            cache_capacity: env_usize("CACHE_CAPACITY", default_cache_capacity()),
            max_concurrent_requests: env_usize("MAX_CONCURRENT_REQUESTS", default_max_concurrent()),
            default_search_limit: env_usize("DEFAULT_SEARCH_LIMIT", default_search_limit()),
            timeout_secs: env_usize("REQUEST_TIMEOUT", default_timeout_secs() as usize) as u64,
        };

        Self {
            scholar,
            pubmed,
            unpaywall,
            tuning,
        }
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pubmed_only() -> Config {
        Config {
            scholar: None,
            pubmed: Some(PubMedConfig {
                email: "someone@example.org".to_string(),
                api_key: None,
                tool: default_pubmed_tool(),
            }),
            unpaywall: None,
            tuning: TuningConfig::default(),
        }
    }

    #[test]
    fn test_empty_config_rejected() {
        let config = Config {
            scholar: None,
            pubmed: None,
            unpaywall: None,
            tuning: TuningConfig::default(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scholar_requires_api_key() {
        let config = Config {
            scholar: Some(ScholarConfig {
                api_key: String::new(),
                base_url: default_scholar_base_url(),
            }),
            pubmed: None,
            unpaywall: None,
            tuning: TuningConfig::default(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolver_email_falls_back_to_pubmed() {
        let config = pubmed_only();
        assert_eq!(
            config.resolver_email().as_deref(),
            Some("someone@example.org")
        );
    }

    #[test]
    fn test_pubmed_only_is_valid() {
        assert!(pubmed_only().validate().is_ok());
    }
}
