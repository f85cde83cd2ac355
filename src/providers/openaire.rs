//! Open repository (OpenAIRE) provider implementation.
//!
//! OpenAIRE returns deeply nested JSON in which most leaf fields are
//! attribute/value objects that may appear as a scalar, a single object,
//! or an array depending on cardinality. Records are navigated
//! dynamically and normalized field by field.

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{
    Document, DocumentBuilder, ParseFailure, ProviderQuery, ProviderResults, SourceKind,
};
use crate::providers::{Provider, ProviderCapabilities, ProviderError};
use crate::utils::{parse, with_retry, HttpClient, RetryConfig};

const OPENAIRE_API_URL: &str = "https://api.openaire.eu";
const OPENAIRE_EXPLORE_URL: &str = "https://explore.openaire.eu/search/publication";

/// OpenAIRE provider. Requires no credentials.
#[derive(Debug, Clone)]
pub struct OpenAireProvider {
    client: HttpClient,
    base_url: String,
    retry: RetryConfig,
}

impl OpenAireProvider {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: OPENAIRE_API_URL.to_string(),
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

    fn parse_response(data: &Value) -> (u64, Vec<Document>, Vec<ParseFailure>) {
        let results = &data["response"]["results"];

        let total = match &results["total"] {
            Value::Number(n) => n.as_u64().unwrap_or(0),
            Value::String(s) => s.parse().unwrap_or(0),
            _ => 0,
        };

        // A single-hit page collapses the result array into one object.
        let items: Vec<&Value> = match &results["result"] {
            Value::Array(items) => items.iter().collect(),
            Value::Null => Vec::new(),
            single => vec![single],
        };

        let mut records = Vec::new();
        let mut failures = Vec::new();

        for item in items {
            match Self::parse_item(item) {
                Ok(doc) => records.push(doc),
                Err(e) => failures.push(ParseFailure {
                    provider: SourceKind::OpenAire,
                    message: e.to_string(),
                }),
            }
        }

        (total, records, failures)
    }

    fn parse_item(item: &Value) -> Result<Document, ProviderError> {
        let metadata = &item["metadata"]["oaf:entity"]["oaf:result"];
        if !metadata.is_object() {
            return Err(ProviderError::Parse(
                "Result item has no oaf:result metadata".to_string(),
            ));
        }

        let title = first_value(&metadata["title"]).unwrap_or_default();
        let doi = Self::extract_pid(&metadata["pid"], "doi");
        let authors = all_values(&metadata["creator"]);
        let publication_date = first_value(&metadata["dateofacceptance"]).unwrap_or_default();
        let journal = first_value(&metadata["journal"]).unwrap_or_default();
        let abstract_text = first_value(&metadata["description"]).unwrap_or_default();
        let pdf_url = Self::extract_pdf_url(&metadata["instance"]);

        let result_id = match &doi {
            Some(doi) => doi.clone(),
            None => {
                let slug: String = title
                    .to_lowercase()
                    .replace(' ', "_")
                    .chars()
                    .take(50)
                    .collect();
                format!("openaire_{}", slug)
            }
        };

        let mut builder = DocumentBuilder::new(SourceKind::OpenAire)
            .title(title)
            .authors(authors)
            .publication_date(publication_date)
            .journal(journal)
            .snippet(parse::truncate_snippet(&abstract_text))
            .abstract_text(abstract_text)
            .result_id(result_id);

        if let Some(doi) = doi {
            builder = builder.source_url(format!("{}?pid={}", OPENAIRE_EXPLORE_URL, doi));
            builder = builder.doi(doi);
        }
        if let Some(url) = pdf_url {
            builder = builder.pdf_url(url);
        }

        Ok(builder.build())
    }

    /// Find a persistent identifier of the given class in the pid field,
    /// which is an object or an array of objects.
    fn extract_pid(pid: &Value, class: &str) -> Option<String> {
        let candidates: Vec<&Value> = match pid {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![pid],
            _ => return None,
        };

        candidates.into_iter().find_map(|p| {
            if p["classid"].as_str() == Some(class) {
                p["value"].as_str().map(|s| s.to_string())
            } else {
                None
            }
        })
    }

    /// Scan the access-instance list for an openly licensed entry whose
    /// resource URL ends in a PDF extension.
    fn extract_pdf_url(instance: &Value) -> Option<String> {
        let instances: Vec<&Value> = match instance {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![instance],
            _ => return None,
        };

        instances.into_iter().find_map(|inst| {
            let open = matches!(inst["accessright"].as_str(), Some("OPEN") | Some("open"));
            if !open {
                return None;
            }
            let url = inst["webresource"]["url"].as_str()?;
            if url.to_lowercase().ends_with(".pdf") {
                Some(url.to_string())
            } else {
                None
            }
        })
    }
}

/// First scalar from an attribute/value field: a plain string, an object
/// carrying `value`, or an array of either.
fn first_value(field: &Value) -> Option<String> {
    match field {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("value").and_then(|v| v.as_str()).map(|s| s.to_string()),
        Value::Array(items) => items.iter().find_map(first_value),
        _ => None,
    }
}

/// All scalars from an attribute/value field.
fn all_values(field: &Value) -> Vec<String> {
    match field {
        Value::Array(items) => items.iter().filter_map(first_value).collect(),
        _ => first_value(field).into_iter().collect(),
    }
}

#[async_trait]
impl Provider for OpenAireProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::OpenAire
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::SEARCH | ProviderCapabilities::DOI_LOOKUP | ProviderCapabilities::ID_LOOKUP
    }

    async fn search(&self, query: &ProviderQuery) -> Result<ProviderResults, ProviderError> {
        let page = if query.max_results > 0 {
            query.offset / query.max_results + 1
        } else {
            1
        };

        let url = format!(
            "{}/search/publications?keywords={}&format=json&size={}&page={}",
            self.base_url,
            urlencoding::encode(&query.query),
            query.max_results,
            page
        );

        let client = self.client.clone();
        let url_for_retry = url.clone();

        let data: Value = with_retry(self.retry, || {
            let client = client.clone();
            let url = url_for_retry.clone();
            async move {
                let response = client.get(&url).send().await.map_err(|e| {
                    ProviderError::Network(format!("Failed to search OpenAIRE: {}", e))
                })?;

                if !response.status().is_success() {
                    return Err(ProviderError::from_status(response.status(), &url));
                }

                response.json().await.map_err(|e| {
                    ProviderError::Parse(format!("Failed to parse OpenAIRE response: {}", e))
                })
            }
        })
        .await?;

        let (total, records, failures) = Self::parse_response(&data);

        Ok(ProviderResults::new(&query.query)
            .total_results(total)
            .records(records)
            .failures(failures))
    }

    async fn get_by_id(&self, id: &str) -> Result<Document, ProviderError> {
        let results = self.search(&ProviderQuery::new(id).max_results(1)).await?;

        results
            .records
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound(format!("OpenAIRE record not found: {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> Value {
        serde_json::json!({
            "response": {
                "results": {
                    "total": "87",
                    "result": [
                        {
                            "metadata": {
                                "oaf:entity": {
                                    "oaf:result": {
                                        "title": {"value": "Open access in high energy physics"},
                                        "pid": [
                                            {"classid": "pmid", "value": "12345"},
                                            {"classid": "doi", "value": "10.5281/zenodo.1234567"}
                                        ],
                                        "creator": [
                                            {"value": "Dana Author"},
                                            {"value": "Erin Author"}
                                        ],
                                        "dateofacceptance": {"value": "2020-03-14"},
                                        "journal": {"value": "Journal of Open Science"},
                                        "description": {"value": "A study of repository coverage."},
                                        "instance": [
                                            {
                                                "accessright": "CLOSED",
                                                "webresource": {"url": "https://example.org/closed.pdf"}
                                            },
                                            {
                                                "accessright": "OPEN",
                                                "webresource": {"url": "https://repo.example.org/oa-copy.pdf"}
                                            }
                                        ]
                                    }
                                }
                            }
                        },
                        {
                            "metadata": {
                                "oaf:entity": {
                                    "oaf:result": {
                                        "title": [{"value": "Untitled dataset survey with a very long name that keeps going"}],
                                        "creator": {"value": "Solo Author"},
                                        "dateofacceptance": "2019",
                                        "instance": {
                                            "accessright": "OPEN",
                                            "webresource": {"url": "https://repo.example.org/landing"}
                                        }
                                    }
                                }
                            }
                        }
                    ]
                }
            }
        })
    }

    #[test]
    fn test_parse_response() {
        let (total, records, failures) = OpenAireProvider::parse_response(&sample_response());

        assert_eq!(total, 87);
        assert_eq!(records.len(), 2);
        assert!(failures.is_empty());

        let first = &records[0];
        assert_eq!(first.title, "Open access in high energy physics");
        assert_eq!(first.doi.as_deref(), Some("10.5281/zenodo.1234567"));
        assert_eq!(first.authors, vec!["Dana Author", "Erin Author"]);
        assert_eq!(first.publication_date, "2020-03-14");
        assert_eq!(first.journal.as_deref(), Some("Journal of Open Science"));
        // Closed instance skipped, open PDF instance wins.
        assert_eq!(
            first.pdf_url.as_deref(),
            Some("https://repo.example.org/oa-copy.pdf")
        );
        assert_eq!(first.result_id.as_deref(), Some("10.5281/zenodo.1234567"));
        assert_eq!(
            first.source_url.as_deref(),
            Some("https://explore.openaire.eu/search/publication?pid=10.5281/zenodo.1234567")
        );

        // Second record: scalar/object field variants, no DOI, open
        // instance without a PDF extension.
        let second = &records[1];
        assert_eq!(second.authors, vec!["Solo Author"]);
        assert_eq!(second.publication_date, "2019");
        assert!(!second.pdf_available);
        let result_id = second.result_id.as_deref().unwrap();
        assert!(result_id.starts_with("openaire_untitled_dataset"));
        assert_eq!(result_id.len(), "openaire_".len() + 50);
    }

    #[test]
    fn test_single_result_object_not_array() {
        let data = serde_json::json!({
            "response": {
                "results": {
                    "total": 1,
                    "result": {
                        "metadata": {
                            "oaf:entity": {
                                "oaf:result": {
                                    "title": {"value": "Lone result"}
                                }
                            }
                        }
                    }
                }
            }
        });

        let (total, records, failures) = OpenAireProvider::parse_response(&data);
        assert_eq!(total, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Lone result");
        assert!(failures.is_empty());
    }

    #[test]
    fn test_item_without_metadata_is_isolated() {
        let data = serde_json::json!({
            "response": {
                "results": {
                    "total": 2,
                    "result": [
                        {"metadata": "garbage"},
                        {
                            "metadata": {
                                "oaf:entity": {
                                    "oaf:result": {"title": {"value": "Survivor"}}
                                }
                            }
                        }
                    ]
                }
            }
        });

        let (_, records, failures) = OpenAireProvider::parse_response(&data);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Survivor");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].provider, SourceKind::OpenAire);
    }

    #[tokio::test]
    async fn test_search_computes_page_from_offset() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search/publications")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("keywords".into(), "open access".into()),
                mockito::Matcher::UrlEncoded("size".into(), "10".into()),
                mockito::Matcher::UrlEncoded("page".into(), "3".into()),
            ]))
            .with_status(200)
            .with_body(sample_response().to_string())
            .create_async()
            .await;

        let provider = OpenAireProvider::new(HttpClient::new().unwrap())
            .with_base_url(server.url())
            .with_retry_config(RetryConfig::immediate());

        let results = provider
            .search(&ProviderQuery::new("open access").max_results(10).offset(20))
            .await
            .unwrap();

        assert_eq!(results.total_results, 87);
        mock.assert_async().await;
    }
}
