//! Registry for provider adapters.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{
    ArxivProvider, OpenAireProvider, Provider, ProviderError, PubMedProvider, ScholarProvider,
};
use crate::config::Config;
use crate::models::SourceKind;
use crate::utils::HttpClient;

bitflags::bitflags! {
    /// Capabilities a provider adapter can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProviderCapabilities: u32 {
        const SEARCH = 1 << 0;
        const DOI_LOOKUP = 1 << 1;
        const ID_LOOKUP = 1 << 2;
    }
}

/// Holds the configured provider adapters, keyed by source identifier.
///
/// Providers that require credentials are registered only when their
/// configuration block is present; fan-out silently skips absent ones.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Build a registry from configuration. The preprint archive and
    /// open repository need no credentials and are always registered.
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let client = HttpClient::with_timeout(Duration::from_secs(config.tuning.timeout_secs))?;

        let mut registry = Self::new();

        if let Some(scholar) = &config.scholar {
            registry.register(Arc::new(ScholarProvider::new(
                client.clone(),
                scholar.api_key.clone(),
                scholar.base_url.clone(),
            )));
        }

        if let Some(pubmed) = &config.pubmed {
            registry.register(Arc::new(PubMedProvider::new(
                client.clone(),
                pubmed.email.clone(),
                pubmed.api_key.clone(),
                pubmed.tool.clone(),
            )));
        }

        registry.register(Arc::new(ArxivProvider::new(client.clone())));
        registry.register(Arc::new(OpenAireProvider::new(client)));

        Ok(registry)
    }

    /// Register an adapter, replacing any existing one for the same source
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers
            .insert(provider.kind().id().to_string(), provider);
    }

    /// Get the adapter for a source, if configured
    pub fn get(&self, kind: &SourceKind) -> Option<&Arc<dyn Provider>> {
        self.providers.get(kind.id())
    }

    /// Whether an adapter is configured for this source
    pub fn has(&self, kind: &SourceKind) -> bool {
        self.providers.contains_key(kind.id())
    }

    /// All registered adapters
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.values()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
