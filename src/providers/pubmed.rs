//! Citation database (PubMed/NCBI E-utilities) provider implementation.
//!
//! Two-phase protocol: a JSON `esearch` for PMIDs and the total hit
//! count, then an XML `efetch` for the article records. A PDF is only
//! available when the article carries a PubMed Central identifier, from
//! which a fixed-pattern repository URL is constructed.

use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::models::{
    Document, DocumentBuilder, ParseFailure, ProviderQuery, ProviderResults, SourceKind,
};
use crate::providers::{Provider, ProviderCapabilities, ProviderError};
use crate::utils::{parse, with_retry, HttpClient, RetryConfig};

const PUBMED_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const PMC_PDF_URL: &str = "https://www.ncbi.nlm.nih.gov/pmc/articles";
const PUBMED_ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// PubMed provider. Requires a contact email for the NCBI identity.
#[derive(Debug, Clone)]
pub struct PubMedProvider {
    client: HttpClient,
    email: String,
    api_key: Option<String>,
    tool: String,
    base_url: String,
    retry: RetryConfig,
}

impl PubMedProvider {
    pub fn new(client: HttpClient, email: String, api_key: Option<String>, tool: String) -> Self {
        Self {
            client,
            email,
            api_key,
            tool,
            base_url: PUBMED_EUTILS_URL.to_string(),
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

    fn identity_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("email", self.email.clone()),
            ("tool", self.tool.clone()),
        ];
        if let Some(api_key) = &self.api_key {
            params.push(("api_key", api_key.clone()));
        }
        params
    }

    fn build_search_url(&self, query: &ProviderQuery) -> String {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("term", query.query.clone()),
            ("retmode", "json".to_string()),
            ("retmax", query.max_results.to_string()),
            ("retstart", query.offset.to_string()),
        ];
        params.extend(self.identity_params());

        if query.year_from.is_some() || query.year_to.is_some() {
            params.push(("datetype", "pdat".to_string()));
            params.push((
                "mindate",
                format!("{}-01-01", query.year_from.unwrap_or(1800)),
            ));
            params.push((
                "maxdate",
                format!("{}-12-31", query.year_to.unwrap_or(2100)),
            ));
        }

        format!("{}/esearch.fcgi?{}", self.base_url, encode_params(&params))
    }

    fn build_fetch_url(&self, ids: &[String]) -> String {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("id", ids.join(",")),
            ("retmode", "xml".to_string()),
            ("rettype", "abstract".to_string()),
        ];
        params.extend(self.identity_params());

        format!("{}/efetch.fcgi?{}", self.base_url, encode_params(&params))
    }

    async fn fetch_text(&self, url: String, what: &'static str) -> Result<String, ProviderError> {
        let client = self.client.clone();

        with_retry(self.retry, || {
            let client = client.clone();
            let url = url.clone();
            async move {
                let response = client.get(&url).send().await.map_err(|e| {
                    ProviderError::Network(format!("Failed to {} PubMed: {}", what, e))
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
        .await
    }

    fn parse_fetch_response(
        xml: &str,
    ) -> Result<(Vec<Document>, Vec<ParseFailure>), ProviderError> {
        let result: PubmedArticleSet = from_str(xml)
            .map_err(|e| ProviderError::Parse(format!("Failed to parse PubMed XML response: {}", e)))?;

        let mut records = Vec::new();
        let mut failures = Vec::new();

        for article in result.articles {
            match Self::parse_article(article) {
                Ok(doc) => records.push(doc),
                Err(e) => failures.push(ParseFailure {
                    provider: SourceKind::PubMed,
                    message: e.to_string(),
                }),
            }
        }

        Ok((records, failures))
    }

    fn parse_article(article: PubmedArticle) -> Result<Document, ProviderError> {
        let citation = article
            .medline_citation
            .ok_or_else(|| ProviderError::Parse("Article has no MedlineCitation".to_string()))?;

        let pmid = citation.pmid.map(|p| p.value).unwrap_or_default();
        let inner = citation.article.unwrap_or_default();

        let title = inner.title.map(|t| t.value).unwrap_or_default();

        let abstract_text = inner
            .r#abstract
            .map(|a| {
                a.texts
                    .into_iter()
                    .filter_map(|t| t.value)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        let authors: Vec<String> = inner
            .author_list
            .map(|al| {
                al.authors
                    .into_iter()
                    .filter_map(|author| {
                        let last = author.last_name.map(|n| n.value);
                        let fore = author.fore_name.map(|n| n.value);
                        match (last, fore) {
                            (Some(last), Some(fore)) => {
                                Some(format!("{} {}", last, fore).trim().to_string())
                            }
                            (Some(last), None) => Some(last),
                            (None, _) => author.collective_name.map(|n| n.value),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let journal = inner.journal.as_ref();
        let journal_title = journal
            .and_then(|j| j.title.as_ref())
            .map(|t| t.value.clone())
            .unwrap_or_default();

        let pub_date = journal
            .and_then(|j| j.issue.as_ref())
            .and_then(|i| i.pub_date.as_ref());
        let publication_date = match pub_date {
            Some(pd) => {
                let composed = parse::compose_date(
                    pd.year.as_ref().map(|y| y.value.as_str()),
                    pd.month.as_ref().map(|m| m.value.as_str()),
                    pd.day.as_ref().map(|d| d.value.as_str()),
                );
                if composed.is_empty() {
                    pd.medline_date
                        .as_ref()
                        .map(|m| m.value.clone())
                        .unwrap_or_default()
                } else {
                    composed
                }
            }
            None => String::new(),
        };

        let article_ids = article
            .pubmed_data
            .and_then(|pd| pd.article_ids)
            .map(|l| l.ids)
            .unwrap_or_default();
        let doi = article_ids
            .iter()
            .find(|id| id.id_type.as_deref() == Some("doi"))
            .and_then(|id| id.value.clone());
        let pmc_id = article_ids
            .iter()
            .find(|id| id.id_type.as_deref() == Some("pmc"))
            .and_then(|id| id.value.clone());

        let mut builder = DocumentBuilder::new(SourceKind::PubMed)
            .title(title)
            .authors(authors)
            .publication_date(publication_date)
            .journal(journal_title)
            .snippet(parse::truncate_snippet(&abstract_text))
            .abstract_text(abstract_text);

        if let Some(doi) = doi {
            builder = builder.doi(doi);
        }
        if let Some(pmc) = pmc_id {
            builder = builder.pdf_url(format!("{}/{}/pdf/", PMC_PDF_URL, pmc));
        }
        if !pmid.is_empty() {
            builder = builder
                .source_url(format!("{}/{}/", PUBMED_ARTICLE_URL, pmid))
                .result_id(pmid.clone())
                .pmid(pmid);
        }

        Ok(builder.build())
    }
}

fn encode_params(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl Provider for PubMedProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::PubMed
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::SEARCH | ProviderCapabilities::DOI_LOOKUP | ProviderCapabilities::ID_LOOKUP
    }

    async fn search(&self, query: &ProviderQuery) -> Result<ProviderResults, ProviderError> {
        let search_url = self.build_search_url(query);
        let body = self.fetch_text(search_url, "search").await?;

        let search_data: ESearchResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Parse(format!("Failed to parse PubMed search JSON: {}", e)))?;
        let result = search_data.esearchresult.unwrap_or_default();

        let total: u64 = result
            .count
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);

        if result.idlist.is_empty() {
            return Ok(ProviderResults::new(&query.query).total_results(total));
        }

        let fetch_url = self.build_fetch_url(&result.idlist);
        let xml = self.fetch_text(fetch_url, "fetch details from").await?;

        let (records, failures) = Self::parse_fetch_response(&xml)?;

        Ok(ProviderResults::new(&query.query)
            .total_results(total)
            .records(records)
            .failures(failures))
    }

    async fn search_doi(&self, doi: &str) -> Result<ProviderResults, ProviderError> {
        self.search(&ProviderQuery::new(format!("{}[doi]", doi)).max_results(1))
            .await
    }

    async fn get_by_id(&self, id: &str) -> Result<Document, ProviderError> {
        let results = self
            .search(&ProviderQuery::new(format!("ID:{}", id)).max_results(1))
            .await?;

        results
            .records
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound(format!("PubMed record not found: {}", id)))
    }
}

/// E-utilities esearch JSON response
#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: Option<ESearchResult>,
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResult {
    /// NCBI reports the count as a JSON string
    count: Option<String>,
    #[serde(default)]
    idlist: Vec<String>,
}

/// E-utilities efetch XML response
#[derive(Debug, Deserialize)]
struct PubmedArticleSet {
    #[serde(rename = "PubmedArticle", default)]
    articles: Vec<PubmedArticle>,
}

#[derive(Debug, Deserialize)]
struct PubmedArticle {
    #[serde(rename = "MedlineCitation")]
    medline_citation: Option<MedlineCitation>,
    #[serde(rename = "PubmedData")]
    pubmed_data: Option<PubmedData>,
}

#[derive(Debug, Deserialize)]
struct MedlineCitation {
    #[serde(rename = "PMID")]
    pmid: Option<XmlText>,
    #[serde(rename = "Article")]
    article: Option<Article>,
}

#[derive(Debug, Default, Deserialize)]
struct Article {
    #[serde(rename = "Journal")]
    journal: Option<Journal>,
    #[serde(rename = "ArticleTitle")]
    title: Option<XmlText>,
    #[serde(rename = "Abstract")]
    r#abstract: Option<Abstract>,
    #[serde(rename = "AuthorList")]
    author_list: Option<AuthorList>,
}

#[derive(Debug, Deserialize)]
struct Journal {
    #[serde(rename = "Title")]
    title: Option<XmlText>,
    #[serde(rename = "JournalIssue")]
    issue: Option<JournalIssue>,
}

#[derive(Debug, Deserialize)]
struct JournalIssue {
    #[serde(rename = "PubDate")]
    pub_date: Option<PubDate>,
}

#[derive(Debug, Deserialize)]
struct PubDate {
    #[serde(rename = "Year")]
    year: Option<XmlText>,
    #[serde(rename = "Month")]
    month: Option<XmlText>,
    #[serde(rename = "Day")]
    day: Option<XmlText>,
    #[serde(rename = "MedlineDate")]
    medline_date: Option<XmlText>,
}

#[derive(Debug, Deserialize)]
struct Abstract {
    #[serde(rename = "AbstractText", default)]
    texts: Vec<AbstractText>,
}

#[derive(Debug, Deserialize)]
struct AbstractText {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorList {
    #[serde(rename = "Author", default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(rename = "LastName")]
    last_name: Option<XmlText>,
    #[serde(rename = "ForeName")]
    fore_name: Option<XmlText>,
    #[serde(rename = "CollectiveName")]
    collective_name: Option<XmlText>,
}

#[derive(Debug, Deserialize)]
struct PubmedData {
    #[serde(rename = "ArticleIdList")]
    article_ids: Option<ArticleIdList>,
}

#[derive(Debug, Deserialize)]
struct ArticleIdList {
    #[serde(rename = "ArticleId", default)]
    ids: Vec<ArticleId>,
}

#[derive(Debug, Deserialize)]
struct ArticleId {
    #[serde(rename = "@IdType")]
    id_type: Option<String>,
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlText {
    #[serde(rename = "$text")]
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FETCH: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID Version="1">34567890</PMID>
      <Article>
        <Journal>
          <Title>The Lancet Oncology</Title>
          <JournalIssue>
            <PubDate>
              <Year>2021</Year>
              <Month>06</Month>
              <Day>15</Day>
            </PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Immunotherapy outcomes in solid tumors</ArticleTitle>
        <Abstract>
          <AbstractText>Background text.</AbstractText>
          <AbstractText>Results text.</AbstractText>
        </Abstract>
        <AuthorList>
          <Author>
            <LastName>Garcia</LastName>
            <ForeName>Maria</ForeName>
          </Author>
          <Author>
            <CollectiveName>The Oncology Consortium</CollectiveName>
          </Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">34567890</ArticleId>
        <ArticleId IdType="doi">10.1016/S1470-2045(21)00123-4</ArticleId>
        <ArticleId IdType="pmc">PMC8123456</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID Version="1">34567891</PMID>
      <Article>
        <Journal>
          <Title>BMJ</Title>
          <JournalIssue>
            <PubDate>
              <Year>2020</Year>
            </PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>A study without free full text</ArticleTitle>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">34567891</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_parse_fetch_response() {
        let (records, failures) = PubMedProvider::parse_fetch_response(SAMPLE_FETCH).unwrap();

        assert_eq!(records.len(), 2);
        assert!(failures.is_empty());

        let first = &records[0];
        assert_eq!(first.title, "Immunotherapy outcomes in solid tumors");
        assert_eq!(first.pmid.as_deref(), Some("34567890"));
        assert_eq!(first.doi.as_deref(), Some("10.1016/S1470-2045(21)00123-4"));
        assert_eq!(first.journal.as_deref(), Some("The Lancet Oncology"));
        assert_eq!(first.publication_date, "2021-06-15");
        assert_eq!(
            first.authors,
            vec!["Garcia Maria", "The Oncology Consortium"]
        );
        assert_eq!(first.r#abstract, "Background text. Results text.");
        assert!(first.pdf_available);
        assert_eq!(
            first.pdf_url.as_deref(),
            Some("https://www.ncbi.nlm.nih.gov/pmc/articles/PMC8123456/pdf/")
        );
        assert_eq!(
            first.source_url.as_deref(),
            Some("https://pubmed.ncbi.nlm.nih.gov/34567890/")
        );

        // No PMC identifier means no PDF; year-only date gets defaults.
        let second = &records[1];
        assert!(!second.pdf_available);
        assert_eq!(second.pdf_url, None);
        assert_eq!(second.publication_date, "2020-01-01");
        assert_eq!(second.r#abstract, "");
    }

    #[test]
    fn test_article_without_citation_is_isolated() {
        let xml = r#"<?xml version="1.0"?>
<PubmedArticleSet>
  <PubmedArticle></PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>1</PMID>
      <Article><ArticleTitle>Kept</ArticleTitle></Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

        let (records, failures) = PubMedProvider::parse_fetch_response(xml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Kept");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].provider, SourceKind::PubMed);
    }

    fn test_provider(base_url: String) -> PubMedProvider {
        PubMedProvider::new(
            HttpClient::new().unwrap(),
            "someone@example.org".to_string(),
            None,
            "scholar-search".to_string(),
        )
        .with_base_url(base_url)
        .with_retry_config(RetryConfig::immediate())
    }

    #[test]
    fn test_search_url_carries_identity_and_years() {
        let provider = test_provider("https://eutils.example".to_string());
        let url = provider.build_search_url(
            &ProviderQuery::new("cancer")
                .max_results(5)
                .year_range(Some(2015), Some(2020)),
        );

        assert!(url.contains("db=pubmed"));
        assert!(url.contains("term=cancer"));
        assert!(url.contains("retmax=5"));
        assert!(url.contains("email=someone%40example.org"));
        assert!(url.contains("tool=scholar-search"));
        assert!(url.contains("datetype=pdat"));
        assert!(url.contains("mindate=2015-01-01"));
        assert!(url.contains("maxdate=2020-12-31"));
    }

    #[tokio::test]
    async fn test_empty_id_list_skips_fetch_phase() {
        let mut server = mockito::Server::new_async().await;
        let esearch = server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"esearchresult": {"count": "0", "idlist": []}}"#)
            .create_async()
            .await;
        let efetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let provider = test_provider(server.url());
        let results = provider
            .search(&ProviderQuery::new("nonexistent topic"))
            .await
            .unwrap();

        assert_eq!(results.total_results, 0);
        assert!(results.records.is_empty());
        esearch.assert_async().await;
        efetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_two_phase_search() {
        let mut server = mockito::Server::new_async().await;
        let esearch = server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"esearchresult": {"count": "1234", "idlist": ["34567890", "34567891"]}}"#)
            .create_async()
            .await;
        let efetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(mockito::Matcher::UrlEncoded(
                "id".into(),
                "34567890,34567891".into(),
            ))
            .with_status(200)
            .with_body(SAMPLE_FETCH)
            .create_async()
            .await;

        let provider = test_provider(server.url());
        let results = provider
            .search(&ProviderQuery::new("immunotherapy").max_results(10))
            .await
            .unwrap();

        assert_eq!(results.total_results, 1234);
        assert_eq!(results.records.len(), 2);
        esearch.assert_async().await;
        efetch.assert_async().await;
    }
}
