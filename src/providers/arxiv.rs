//! Preprint archive (arXiv) provider implementation.
//!
//! Parses the arXiv Atom feed, including the `arxiv:` extension elements
//! and the `opensearch:totalResults` count. Every arXiv record has a
//! deterministic PDF URL derived from its identifier.

use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::models::{
    Document, DocumentBuilder, ParseFailure, ProviderQuery, ProviderResults, SourceKind,
};
use crate::providers::{Provider, ProviderCapabilities, ProviderError};
use crate::utils::{parse, with_retry, HttpClient, RetryConfig};

const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";
const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf";
const ARXIV_ABS_URL: &str = "https://arxiv.org/abs";

/// arXiv provider. Requires no credentials.
#[derive(Debug, Clone)]
pub struct ArxivProvider {
    client: HttpClient,
    base_url: String,
    retry: RetryConfig,
}

impl ArxivProvider {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: ARXIV_API_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }

    /// Point the adapter at a different endpoint (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Parse an Atom feed into the provider-reported total plus records,
    /// isolating entries that fail to parse.
    fn parse_feed(xml: &str) -> Result<(u64, Vec<Document>, Vec<ParseFailure>), ProviderError> {
        let feed: AtomFeed = from_str(xml)
            .map_err(|e| ProviderError::Parse(format!("Failed to parse arXiv Atom feed: {}", e)))?;

        let total = feed
            .total_results
            .and_then(|t| t.value)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);

        let mut records = Vec::new();
        let mut failures = Vec::new();

        for entry in feed.entries {
            match Self::parse_entry(entry) {
                Ok(doc) => records.push(doc),
                Err(e) => failures.push(ParseFailure {
                    provider: SourceKind::Arxiv,
                    message: e.to_string(),
                }),
            }
        }

        Ok((total, records, failures))
    }

    fn parse_entry(entry: AtomEntry) -> Result<Document, ProviderError> {
        let full_id = entry
            .id
            .and_then(|t| t.value)
            .ok_or_else(|| ProviderError::Parse("Entry has no id".to_string()))?;
        let arxiv_id = full_id
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::Parse(format!("Malformed entry id: {}", full_id)))?
            .to_string();

        let title = entry
            .title
            .and_then(|t| t.value)
            .unwrap_or_default()
            .trim()
            .to_string();
        let summary = entry
            .summary
            .and_then(|t| t.value)
            .unwrap_or_default()
            .trim()
            .to_string();

        let authors: Vec<String> = entry
            .authors
            .into_iter()
            .filter_map(|a| a.name.and_then(|n| n.value))
            .collect();

        let publication_date = entry
            .published
            .and_then(|t| t.value)
            .map(|p| parse::date_from_timestamp(&p))
            .unwrap_or_default();

        let categories: Vec<String> = entry
            .categories
            .into_iter()
            .filter_map(|c| c.term)
            .collect();

        let mut builder = DocumentBuilder::new(SourceKind::Arxiv)
            .title(title)
            .authors(authors)
            .publication_date(publication_date)
            .snippet(parse::truncate_snippet(&summary))
            .abstract_text(summary)
            .pdf_url(format!("{}/{}", ARXIV_PDF_URL, arxiv_id))
            .source_url(format!("{}/{}", ARXIV_ABS_URL, arxiv_id))
            .result_id(arxiv_id.clone())
            .arxiv_id(arxiv_id)
            .categories(categories);

        if let Some(doi) = entry.doi.and_then(|t| t.value) {
            builder = builder.doi(doi);
        }
        if let Some(journal_ref) = entry.journal_ref.and_then(|t| t.value) {
            builder = builder.journal(journal_ref);
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl Provider for ArxivProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Arxiv
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::SEARCH | ProviderCapabilities::DOI_LOOKUP | ProviderCapabilities::ID_LOOKUP
    }

    async fn search(&self, query: &ProviderQuery) -> Result<ProviderResults, ProviderError> {
        let url = format!(
            "{}?search_query={}&start={}&max_results={}&sortBy=relevance&sortOrder=descending",
            self.base_url,
            urlencoding::encode(&format!("all:{}", query.query)),
            query.offset,
            query.max_results
        );

        let client = self.client.clone();
        let url_for_retry = url.clone();

        let xml = with_retry(self.retry, || {
            let client = client.clone();
            let url = url_for_retry.clone();
            async move {
                let response = client.get(&url).send().await.map_err(|e| {
                    ProviderError::Network(format!("Failed to fetch arXiv results: {}", e))
                })?;

                if !response.status().is_success() {
                    return Err(ProviderError::from_status(response.status(), &url));
                }

                response
                    .text()
                    .await
                    .map_err(|e| ProviderError::Network(format!("Failed to read response: {}", e)))
            }
        })
        .await?;

        let (total, records, failures) = Self::parse_feed(&xml)?;

        Ok(ProviderResults::new(&query.query)
            .total_results(total)
            .records(records)
            .failures(failures))
    }

    async fn search_doi(&self, doi: &str) -> Result<ProviderResults, ProviderError> {
        self.search(&ProviderQuery::new(format!("doi:{}", doi)).max_results(1))
            .await
    }

    async fn get_by_id(&self, id: &str) -> Result<Document, ProviderError> {
        let results = self
            .search(&ProviderQuery::new(format!("id:{}", id)).max_results(1))
            .await?;

        results
            .records
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound(format!("arXiv entry not found: {}", id)))
    }
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "totalResults")]
    total_results: Option<XmlText>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<XmlText>,
    title: Option<XmlText>,
    summary: Option<XmlText>,
    published: Option<XmlText>,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "doi")]
    doi: Option<XmlText>,
    #[serde(rename = "journal_ref")]
    journal_ref: Option<XmlText>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<XmlText>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlText {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title>ArXiv Query: search_query=all:quantum computing</title>
  <opensearch:totalResults>2</opensearch:totalResults>
  <opensearch:startIndex>0</opensearch:startIndex>
  <entry>
    <id>http://arxiv.org/abs/2101.00001</id>
    <title>Variational Quantum Circuits</title>
    <summary>We study variational circuits.</summary>
    <published>2021-01-01T00:00:00Z</published>
    <author><name>Alice Example</name></author>
    <author><name>Bob Example</name></author>
    <arxiv:doi>10.1103/PhysRevA.103.000001</arxiv:doi>
    <arxiv:journal_ref>Phys. Rev. A 103, 000001</arxiv:journal_ref>
    <category term="quant-ph" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <link href="http://arxiv.org/abs/2101.00001" rel="alternate" type="text/html"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2101.00002</id>
    <title>Quantum Error Correction Surfaces</title>
    <summary>A survey of surface codes.</summary>
    <published>2021-01-02T12:30:00Z</published>
    <author><name>Carol Example</name></author>
    <category term="quant-ph" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed() {
        let (total, records, failures) = ArxivProvider::parse_feed(SAMPLE_FEED).unwrap();

        assert_eq!(total, 2);
        assert_eq!(records.len(), 2);
        assert!(failures.is_empty());

        let first = &records[0];
        assert_eq!(first.title, "Variational Quantum Circuits");
        assert_eq!(first.authors, vec!["Alice Example", "Bob Example"]);
        assert_eq!(first.publication_date, "2021-01-01");
        assert_eq!(first.arxiv_id.as_deref(), Some("2101.00001"));
        assert_eq!(first.doi.as_deref(), Some("10.1103/PhysRevA.103.000001"));
        assert_eq!(first.journal.as_deref(), Some("Phys. Rev. A 103, 000001"));
        assert_eq!(
            first.categories.as_deref(),
            Some(&["quant-ph".to_string(), "cs.LG".to_string()][..])
        );
        assert!(first.pdf_available);
        assert_eq!(
            first.pdf_url.as_deref(),
            Some("https://arxiv.org/pdf/2101.00001")
        );
        assert_eq!(
            first.source_url.as_deref(),
            Some("https://arxiv.org/abs/2101.00001")
        );
        assert_eq!(first.source, SourceKind::Arxiv);

        let second = &records[1];
        assert_eq!(second.doi, None);
        assert_eq!(second.journal, None);
        assert_eq!(
            second.pdf_url.as_deref(),
            Some("https://arxiv.org/pdf/2101.00002")
        );
    }

    #[test]
    fn test_entry_without_id_is_isolated() {
        let xml = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">
  <opensearch:totalResults>2</opensearch:totalResults>
  <entry>
    <title>No identifier here</title>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2101.00003</id>
    <title>Survivor</title>
    <summary>Still parsed.</summary>
  </entry>
</feed>"#;

        let (total, records, failures) = ArxivProvider::parse_feed(xml).unwrap();
        assert_eq!(total, 2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Survivor");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].provider, SourceKind::Arxiv);
    }

    #[tokio::test]
    async fn test_search_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/atom+xml")
            .with_body(SAMPLE_FEED)
            .create_async()
            .await;

        let provider = ArxivProvider::new(HttpClient::new().unwrap())
            .with_base_url(server.url())
            .with_retry_config(RetryConfig::immediate());

        let results = provider
            .search(&ProviderQuery::new("quantum computing").max_results(5))
            .await
            .unwrap();

        assert_eq!(results.total_results, 2);
        assert_eq!(results.records.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_retried_then_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let provider = ArxivProvider::new(HttpClient::new().unwrap())
            .with_base_url(server.url())
            .with_retry_config(RetryConfig::immediate());

        let err = provider
            .search(&ProviderQuery::new("anything"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Api(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let provider = ArxivProvider::new(HttpClient::new().unwrap())
            .with_base_url(server.url())
            .with_retry_config(RetryConfig::immediate());

        let err = provider
            .search(&ProviderQuery::new("anything"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::NotFound(_)));
        mock.assert_async().await;
    }
}
