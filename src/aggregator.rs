//! Cross-provider orchestration: fan-out, merge, PDF backfill,
//! filtering, and pagination.
//!
//! Provider calls within one aggregate search are issued sequentially;
//! a single provider's failure is logged and never aborts the rest.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::RetrievalError;
use crate::models::{
    Document, GetDocumentRequest, OpenAccessInfo, Pagination, ProviderQuery, SearchRequest,
    SearchResult, SourceKind,
};
use crate::providers::{ProviderError, ProviderRegistry};
use crate::resolver::PdfResolver;
use crate::utils::{parse, HttpClient};

/// A single provider's failure during fan-out, retained for logging only.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub provider: SourceKind,
    pub message: String,
}

/// Owns the configured providers and the optional PDF resolver.
#[derive(Debug)]
pub struct Aggregator {
    providers: ProviderRegistry,
    resolver: Option<Arc<PdfResolver>>,
    default_limit: usize,
}

impl Aggregator {
    /// Build an aggregator from configuration, validating it first.
    pub fn new(config: &Config) -> Result<Self, RetrievalError> {
        config.validate()?;

        let providers = ProviderRegistry::from_config(config)
            .map_err(|e| RetrievalError::Configuration(e.to_string()))?;

        let resolver = match config.resolver_email() {
            Some(email) => {
                let client =
                    HttpClient::with_timeout(Duration::from_secs(config.tuning.timeout_secs))
                        .map_err(|e| RetrievalError::Configuration(e.to_string()))?;
                Some(Arc::new(
                    PdfResolver::new(client, email)
                        .with_cache_capacity(config.tuning.cache_capacity),
                ))
            }
            None => None,
        };

        Ok(Self {
            providers,
            resolver,
            default_limit: config.tuning.default_search_limit,
        })
    }

    /// Assemble an aggregator from already-built parts (used by tests).
    pub fn with_parts(providers: ProviderRegistry, resolver: Option<Arc<PdfResolver>>) -> Self {
        Self {
            providers,
            resolver,
            default_limit: 10,
        }
    }

    /// Fan a query out to the requested providers and merge the outcome.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult, RetrievalError> {
        let limit = self.validate_search(request)?;

        let mut provider_total: u64 = 0;
        let mut merged: Vec<Document> = Vec::new();
        let mut failures: Vec<ProviderFailure> = Vec::new();

        for kind in &request.sources {
            let Some(provider) = self.providers.get(kind) else {
                // Unconfigured or unknown sources are skipped, not errors.
                continue;
            };

            let query = ProviderQuery::new(&request.query)
                .max_results(limit)
                .offset(request.offset)
                .year_range(request.year_from, request.year_to)
                .journal(request.journal.clone());

            match provider.search(&query).await {
                Ok(results) => {
                    for failure in &results.failures {
                        tracing::warn!(
                            provider = %failure.provider,
                            message = %failure.message,
                            "dropped unparseable record"
                        );
                    }
                    provider_total += results.total_results;
                    merged.extend(results.records);
                }
                Err(e) => {
                    tracing::warn!(provider = %kind, error = %e, "provider search failed");
                    failures.push(ProviderFailure {
                        provider: kind.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            provider_total,
            merged = merged.len(),
            failed_providers = failures.len(),
            "fan-out complete"
        );

        if merged.is_empty() {
            return Ok(SearchResult {
                query: request.query.clone(),
                total_results: 0,
                results: Vec::new(),
                pagination: Pagination::empty(),
            });
        }

        if request.resolve_pdfs && self.resolver.is_some() {
            for doc in merged.iter_mut() {
                self.backfill_pdf(doc, None).await;
            }
        }

        if request.year_from.is_some() || request.year_to.is_some() {
            // A record whose date carries no recognizable year is kept:
            // the filter only excludes known, out-of-range years.
            merged.retain(|doc| match parse::extract_year(&doc.publication_date) {
                Some(year) => {
                    request.year_from.map_or(true, |from| year >= from)
                        && request.year_to.map_or(true, |to| year <= to)
                }
                None => true,
            });
        }

        if let Some(journal) = &request.journal {
            let needle = journal.to_lowercase();
            merged.retain(|doc| {
                doc.journal
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase()
                    .contains(&needle)
            });
        }

        if request.pdf_only {
            merged.retain(|doc| doc.pdf_available);
        }

        if request.full_text_only {
            merged.retain(|doc| doc.full_text_available);
        }

        // The response total is the post-filter count, which generally
        // disagrees with the sum of provider-reported totals accumulated
        // above; that sum is logged and otherwise unused.
        let total = merged.len();

        Ok(SearchResult {
            query: request.query.clone(),
            total_results: total as u64,
            results: merged,
            pagination: Pagination::compute(total, limit, request.offset),
        })
    }

    /// Retrieve one document by DOI or provider-scoped identifier.
    pub async fn get_document(
        &self,
        request: &GetDocumentRequest,
    ) -> Result<Document, RetrievalError> {
        let result_id = request.result_id.as_deref().unwrap_or("");
        let doi = request.doi.as_deref().unwrap_or("");

        if result_id.is_empty() && doi.is_empty() {
            return Err(RetrievalError::Validation(
                "either result_id or DOI is required".to_string(),
            ));
        }

        if result_id.is_empty() {
            return self.get_by_doi(doi, request.resolve_pdf).await;
        }

        self.get_by_result_id(result_id, request.source.clone(), request.doi.as_deref(), request.resolve_pdf)
            .await
    }

    /// Probe providers for a DOI in fixed priority order, synthesizing a
    /// stub record from PDF resolution when every provider misses.
    async fn get_by_doi(&self, doi: &str, resolve_pdf: bool) -> Result<Document, RetrievalError> {
        let mut source_errors: Vec<(SourceKind, String)> = Vec::new();

        let probe_order = [SourceKind::Arxiv, SourceKind::PubMed, SourceKind::OpenAire];
        for kind in probe_order {
            let Some(provider) = self.providers.get(&kind) else {
                continue;
            };

            match provider.search_doi(doi).await {
                Ok(results) => {
                    if let Some(mut doc) = results.records.into_iter().next() {
                        tracing::debug!(provider = %kind, doi, "DOI resolved by provider");
                        if resolve_pdf {
                            self.backfill_pdf(&mut doc, Some(doi)).await;
                        }
                        return Ok(doc);
                    }
                }
                Err(e) => {
                    tracing::warn!(provider = %kind, doi, error = %e, "DOI probe failed");
                    source_errors.push((kind, e.to_string()));
                }
            }
        }

        // No provider knows the DOI. If resolution still finds an open
        // copy, return a minimal stub rather than failing.
        if let Some(resolver) = &self.resolver {
            let resolution = resolver.resolve(doi).await;
            if resolution.pdf_available {
                let mut doc = Document::new(SourceKind::Unpaywall);
                doc.title = format!("Document with DOI: {}", doi);
                doc.doi = Some(doi.to_string());
                doc.pdf_available = true;
                doc.pdf_url = resolution.pdf_url;
                doc.source_url = Some(format!("https://doi.org/{}", doi));
                doc.result_id = Some(doi.to_string());
                doc.unpaywall = Some(OpenAccessInfo {
                    oa_status: resolution.oa_status,
                    source: resolution.source,
                });
                return Ok(doc);
            }
        }

        let details = source_errors
            .iter()
            .map(|(kind, error)| format!("{}: {}", kind, error))
            .collect::<Vec<_>>()
            .join(", ");
        Err(RetrievalError::NotFound(format!(
            "Could not find document with DOI {} in any source. Errors: {}",
            doi, details
        )))
    }

    async fn get_by_result_id(
        &self,
        result_id: &str,
        source: Option<SourceKind>,
        doi: Option<&str>,
        resolve_pdf: bool,
    ) -> Result<Document, RetrievalError> {
        let source = source.unwrap_or_else(|| Self::infer_source(result_id));

        let lookup_id = match &source {
            // OpenAIRE has no native id endpoint; a DOI, when supplied,
            // is the stronger key.
            SourceKind::OpenAire => doi.filter(|d| !d.is_empty()).unwrap_or(result_id),
            _ => result_id,
        };

        let provider = self.providers.get(&source).ok_or_else(|| {
            RetrievalError::NotFound(format!(
                "Document with ID {} not found in {} source",
                result_id, source
            ))
        })?;

        let mut doc = match provider.get_by_id(lookup_id).await {
            Ok(doc) => doc,
            Err(ProviderError::NotFound(_)) => {
                return Err(RetrievalError::NotFound(format!(
                    "Document with ID {} not found in {} source",
                    result_id, source
                )))
            }
            Err(e) => {
                return Err(RetrievalError::Api(format!(
                    "Failed to retrieve document from {}: {}",
                    source, e
                )))
            }
        };

        if resolve_pdf {
            self.backfill_pdf(&mut doc, doi).await;
        }

        Ok(doc)
    }

    /// Identifier-shape source inference for requests without a source
    /// hint: numeric or "PMC"-prefixed ids belong to the citation
    /// database, dotless ids to the preprint archive, "openaire_" ids to
    /// the open repository, anything else to the academic search engine.
    fn infer_source(result_id: &str) -> SourceKind {
        if result_id.starts_with("PMC") || result_id.chars().all(|c| c.is_ascii_digit()) {
            SourceKind::PubMed
        } else if result_id.starts_with("openaire_") {
            SourceKind::OpenAire
        } else if !result_id.contains('.') {
            SourceKind::Arxiv
        } else {
            SourceKind::GoogleScholar
        }
    }

    /// Merge a PDF resolution into a record that lacks one. The explicit
    /// DOI hint takes precedence over the record's own DOI.
    async fn backfill_pdf(&self, doc: &mut Document, doi_hint: Option<&str>) {
        let Some(resolver) = &self.resolver else {
            return;
        };
        if doc.has_pdf() {
            return;
        }
        let doi = doi_hint
            .map(|d| d.to_string())
            .filter(|d| !d.is_empty())
            .or_else(|| doc.doi.clone());
        let Some(doi) = doi.filter(|d| !d.is_empty()) else {
            return;
        };

        let resolution = resolver.resolve(&doi).await;
        if resolution.pdf_available && resolution.pdf_url.is_some() {
            doc.pdf_available = true;
            doc.pdf_url = resolution.pdf_url;
            doc.unpaywall = Some(OpenAccessInfo {
                oa_status: resolution.oa_status,
                source: resolution.source,
            });
        }
    }

    fn validate_search(&self, request: &SearchRequest) -> Result<usize, RetrievalError> {
        if request.query.is_empty() {
            return Err(RetrievalError::Validation(
                "query parameter is required".to_string(),
            ));
        }

        let limit = request.limit.unwrap_or(self.default_limit);
        if limit < 1 {
            return Err(RetrievalError::Validation(
                "limit must be a positive integer".to_string(),
            ));
        }

        Ok(limit)
    }
}
