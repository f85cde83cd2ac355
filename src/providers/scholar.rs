//! Academic search engine (SerpAPI Google Scholar) provider implementation.
//!
//! SerpAPI returns flat JSON with a few nested objects. Authors, journal,
//! and year are not separately structured; they are recovered from the
//! free-text publication summary. PDF availability is a three-step
//! heuristic: a PDF-typed resource link, a main link ending in a PDF
//! extension, or a PDF URL embedded in the snippet, in that order.

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{Document, DocumentBuilder, ProviderQuery, ProviderResults, SourceKind};
use crate::providers::{Provider, ProviderCapabilities, ProviderError};
use crate::utils::{parse, with_retry, HttpClient, RetryConfig};

/// SerpAPI Google Scholar provider. Requires an API key.
#[derive(Debug, Clone)]
pub struct ScholarProvider {
    client: HttpClient,
    api_key: String,
    base_url: String,
    retry: RetryConfig,
}

impl ScholarProvider {
    pub fn new(client: HttpClient, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn build_url(&self, params: &[(&str, String)]) -> String {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.base_url, query)
    }

    async fn fetch_json(&self, url: String) -> Result<serde_json::Value, ProviderError> {
        let client = self.client.clone();

        with_retry(self.retry, || {
            let client = client.clone();
            let url = url.clone();
            async move {
                let response = client.get(&url).send().await.map_err(|e| {
                    ProviderError::Network(format!("SerpAPI request failed: {}", e))
                })?;

                if !response.status().is_success() {
                    return Err(ProviderError::from_status(response.status(), &url));
                }

                response.json().await.map_err(|e| {
                    ProviderError::Parse(format!("Failed to process SerpAPI response: {}", e))
                })
            }
        })
        .await
    }

    fn normalize_search(raw: ScholarResponse, journal_filter: Option<&str>) -> ProviderResults {
        let query = raw
            .search_parameters
            .and_then(|p| p.q)
            .unwrap_or_default();

        let mut records: Vec<Document> = raw
            .organic_results
            .into_iter()
            .map(Self::normalize_result)
            .collect();

        // The provider reports no global hit count; the page size stands
        // in for it, adjusted when the adapter-level journal filter runs.
        if let Some(journal) = journal_filter {
            let needle = journal.to_lowercase();
            records.retain(|r| {
                r.journal
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase()
                    .contains(&needle)
            });
        }

        let total = records.len() as u64;
        ProviderResults::new(query)
            .total_results(total)
            .records(records)
    }

    fn normalize_result(result: OrganicResult) -> Document {
        let summary = result
            .publication_info
            .and_then(|p| p.summary)
            .unwrap_or_default();
        let snippet = result.snippet.unwrap_or_default();
        let link = result.link.unwrap_or_default();

        let pdf_url = Self::extract_pdf_url(&result.resources, &link, &snippet);

        let citation_count = result
            .inline_links
            .and_then(|l| l.cited_by)
            .and_then(|c| c.total)
            .unwrap_or(0) as u32;

        let mut builder = DocumentBuilder::new(SourceKind::GoogleScholar)
            .title(result.title.unwrap_or_default())
            .authors(Self::parse_authors(&summary))
            .publication_date(Self::extract_date(&summary))
            .journal(Self::extract_journal(&summary))
            .snippet(parse::truncate_snippet(&snippet))
            .abstract_text(snippet)
            .citation_count(citation_count)
            .source_url(link.clone())
            .result_id(result.result_id.unwrap_or_default());

        if let Some(doi) = parse::extract_doi(&link) {
            builder = builder.doi(doi);
        }
        if let Some(url) = pdf_url {
            builder = builder.pdf_url(url);
        }

        builder.build()
    }

    fn normalize_citation(raw: CitationResponse) -> Document {
        let citation = raw.citation.unwrap_or_default();
        let link = citation.link.unwrap_or_default();
        let description = citation.description.unwrap_or_default();

        let authors: Vec<String> = citation
            .authors
            .as_deref()
            .map(|a| a.split(", ").map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        let pdf_url = Self::extract_pdf_url(&citation.resources, &link, &description);

        let mut builder = DocumentBuilder::new(SourceKind::GoogleScholar)
            .title(citation.title.unwrap_or_default())
            .authors(authors)
            .publication_date(citation.publication_date.unwrap_or_default())
            .journal(citation.journal.unwrap_or_default())
            .snippet(parse::truncate_snippet(&description))
            .abstract_text(description)
            .source_url(link.clone());

        if let Some(doi) = parse::extract_doi(&link) {
            builder = builder.doi(doi);
        }
        if let Some(url) = pdf_url {
            builder = builder.pdf_url(url);
        }

        builder.build()
    }

    /// PDF location heuristic. First match wins, in priority order:
    /// a PDF-typed resource, a main link with a PDF extension, then a
    /// PDF URL embedded in the preview text.
    fn extract_pdf_url(resources: &[ScholarResource], link: &str, text: &str) -> Option<String> {
        for resource in resources {
            let is_pdf = resource
                .file_format
                .as_deref()
                .map(|f| f.eq_ignore_ascii_case("PDF"))
                .unwrap_or(false);
            if is_pdf {
                if let Some(url) = &resource.link {
                    return Some(url.clone());
                }
            }
        }

        if link.to_lowercase().ends_with(".pdf") {
            return Some(link.to_string());
        }

        parse::find_pdf_link(text)
    }

    /// Authors from a "Authors - Title, Year - journal" summary: the
    /// segment before the first " - ", comma-split into names.
    fn parse_authors(summary: &str) -> Vec<String> {
        match summary.split_once(" - ") {
            Some((authors, _)) => authors
                .split(", ")
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Journal from the third " - " segment, up to the first comma.
    fn extract_journal(summary: &str) -> String {
        let parts: Vec<&str> = summary.split(" - ").collect();
        if parts.len() > 2 {
            parts[2]
                .split(',')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        } else {
            String::new()
        }
    }

    /// The publication summary carries at best a 4-digit year.
    fn extract_date(summary: &str) -> String {
        parse::extract_year(summary)
            .map(|y| y.to_string())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Provider for ScholarProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::GoogleScholar
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::SEARCH | ProviderCapabilities::ID_LOOKUP
    }

    async fn search(&self, query: &ProviderQuery) -> Result<ProviderResults, ProviderError> {
        let mut params = vec![
            ("engine", "google_scholar".to_string()),
            ("q", query.query.clone()),
            ("api_key", self.api_key.clone()),
            ("num", query.max_results.to_string()),
            ("start", query.offset.to_string()),
        ];

        if let Some(year_from) = query.year_from {
            params.push(("as_ylo", year_from.to_string()));
        }
        if let Some(year_to) = query.year_to {
            params.push(("as_yhi", year_to.to_string()));
        }

        let value = self.fetch_json(self.build_url(&params)).await?;
        let raw: ScholarResponse = serde_json::from_value(value)
            .map_err(|e| ProviderError::Parse(format!("Failed to process SerpAPI response: {}", e)))?;

        Ok(Self::normalize_search(raw, query.journal.as_deref()))
    }

    async fn get_by_id(&self, id: &str) -> Result<Document, ProviderError> {
        let params = vec![
            ("engine", "google_scholar_cite".to_string()),
            ("q", id.to_string()),
            ("api_key", self.api_key.clone()),
        ];

        let value = self.fetch_json(self.build_url(&params)).await?;
        let raw: CitationResponse = serde_json::from_value(value).map_err(|e| {
            ProviderError::Parse(format!("Failed to process SerpAPI citation response: {}", e))
        })?;

        Ok(Self::normalize_citation(raw))
    }
}

/// SerpAPI search response
#[derive(Debug, Default, Deserialize)]
struct ScholarResponse {
    search_parameters: Option<SearchParameters>,
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct SearchParameters {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: Option<String>,
    result_id: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
    publication_info: Option<PublicationInfo>,
    inline_links: Option<InlineLinks>,
    #[serde(default)]
    resources: Vec<ScholarResource>,
}

#[derive(Debug, Deserialize)]
struct PublicationInfo {
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InlineLinks {
    cited_by: Option<CitedBy>,
}

#[derive(Debug, Deserialize)]
struct CitedBy {
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ScholarResource {
    file_format: Option<String>,
    link: Option<String>,
}

/// SerpAPI citation response
#[derive(Debug, Deserialize)]
struct CitationResponse {
    citation: Option<Citation>,
}

#[derive(Debug, Default, Deserialize)]
struct Citation {
    title: Option<String>,
    authors: Option<String>,
    publication_date: Option<String>,
    journal: Option<String>,
    description: Option<String>,
    link: Option<String>,
    #[serde(default)]
    resources: Vec<ScholarResource>,
}
