//! Canonical document model shared by every provider.

use serde::{Deserialize, Serialize};

/// The provider a document was retrieved from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "google_scholar")]
    GoogleScholar,
    #[serde(rename = "arxiv")]
    Arxiv,
    #[serde(rename = "pubmed")]
    PubMed,
    #[serde(rename = "openaire")]
    OpenAire,
    #[serde(rename = "unpaywall")]
    Unpaywall,
    #[serde(untagged)]
    Other(String),
}

impl SourceKind {
    /// Returns the display name of the source
    pub fn name(&self) -> &str {
        match self {
            SourceKind::GoogleScholar => "Google Scholar",
            SourceKind::Arxiv => "arXiv",
            SourceKind::PubMed => "PubMed",
            SourceKind::OpenAire => "OpenAIRE",
            SourceKind::Unpaywall => "Unpaywall",
            SourceKind::Other(s) => s,
        }
    }

    /// Returns the source identifier used on the wire
    pub fn id(&self) -> &str {
        match self {
            SourceKind::GoogleScholar => "google_scholar",
            SourceKind::Arxiv => "arxiv",
            SourceKind::PubMed => "pubmed",
            SourceKind::OpenAire => "openaire",
            SourceKind::Unpaywall => "unpaywall",
            SourceKind::Other(s) => s,
        }
    }

    /// All providers that participate in a default fan-out, in probe order.
    pub fn all_searchable() -> Vec<SourceKind> {
        vec![
            SourceKind::GoogleScholar,
            SourceKind::Arxiv,
            SourceKind::PubMed,
            SourceKind::OpenAire,
        ]
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Open-access metadata attached to a document after PDF resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAccessInfo {
    /// Open-access classification (gold, green, bronze, hybrid, closed)
    pub oa_status: Option<String>,

    /// Repository or institution hosting the copy
    pub source: Option<String>,
}

/// A scholarly document normalized into the canonical schema.
///
/// Every provider adapter produces this shape regardless of its native
/// wire format. Provider-specific extension fields are serialized only
/// when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document title
    pub title: String,

    /// Author names in the provider's order
    pub authors: Vec<String>,

    /// Best-effort publication date. Providers report different
    /// granularities, so this is "YYYY-MM-DD", "YYYY-MM", "YYYY", or "".
    pub publication_date: String,

    /// Journal or venue name
    pub journal: Option<String>,

    /// Short preview, at most 200 characters before the ellipsis
    pub snippet: String,

    /// Full abstract when available, else empty
    pub r#abstract: String,

    /// Digital Object Identifier
    pub doi: Option<String>,

    /// Whether a PDF location is known
    pub pdf_available: bool,

    /// PDF location; present whenever `pdf_available` is true
    pub pdf_url: Option<String>,

    /// No adapter extracts full text
    pub full_text_available: bool,

    /// Always `None` in the current design
    pub full_text: Option<String>,

    /// Citation count, 0 when the provider does not report one
    pub citation_count: u32,

    /// Provider the document came from
    pub source: SourceKind,

    /// Canonical page for the document at the provider
    pub source_url: Option<String>,

    /// Provider-scoped identifier
    pub result_id: Option<String>,

    /// arXiv identifier (preprint archive only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arxiv_id: Option<String>,

    /// Subject categories (preprint archive only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,

    /// PubMed identifier (citation database only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pmid: Option<String>,

    /// Open-access metadata added by PDF resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unpaywall: Option<OpenAccessInfo>,
}

impl Document {
    /// Create an empty document from the given source
    pub fn new(source: SourceKind) -> Self {
        Self {
            title: String::new(),
            authors: Vec::new(),
            publication_date: String::new(),
            journal: None,
            snippet: String::new(),
            r#abstract: String::new(),
            doi: None,
            pdf_available: false,
            pdf_url: None,
            full_text_available: false,
            full_text: None,
            citation_count: 0,
            source,
            source_url: None,
            result_id: None,
            arxiv_id: None,
            categories: None,
            pmid: None,
            unpaywall: None,
        }
    }

    /// Whether this document carries a usable PDF location
    pub fn has_pdf(&self) -> bool {
        self.pdf_available && self.pdf_url.is_some()
    }
}

/// Builder for constructing [`Document`] values
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Start a builder for the given source
    pub fn new(source: SourceKind) -> Self {
        Self {
            document: Document::new(source),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.document.title = title.into();
        self
    }

    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.document.authors = authors;
        self
    }

    pub fn publication_date(mut self, date: impl Into<String>) -> Self {
        self.document.publication_date = date.into();
        self
    }

    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        let journal = journal.into();
        if !journal.is_empty() {
            self.document.journal = Some(journal);
        }
        self
    }

    pub fn snippet(mut self, snippet: impl Into<String>) -> Self {
        self.document.snippet = snippet.into();
        self
    }

    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        self.document.r#abstract = text.into();
        self
    }

    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        let doi = doi.into();
        if !doi.is_empty() {
            self.document.doi = Some(doi);
        }
        self
    }

    /// Record a known PDF location. Keeps the `pdf_available` flag and
    /// the URL in lockstep so one can never be observed without the other.
    pub fn pdf_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.is_empty() {
            self.document.pdf_available = true;
            self.document.pdf_url = Some(url);
        }
        self
    }

    pub fn citation_count(mut self, count: u32) -> Self {
        self.document.citation_count = count;
        self
    }

    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.is_empty() {
            self.document.source_url = Some(url);
        }
        self
    }

    pub fn result_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !id.is_empty() {
            self.document.result_id = Some(id);
        }
        self
    }

    pub fn arxiv_id(mut self, id: impl Into<String>) -> Self {
        self.document.arxiv_id = Some(id.into());
        self
    }

    pub fn categories(mut self, categories: Vec<String>) -> Self {
        self.document.categories = Some(categories);
        self
    }

    pub fn pmid(mut self, pmid: impl Into<String>) -> Self {
        self.document.pmid = Some(pmid.into());
        self
    }

    pub fn build(self) -> Document {
        self.document
    }
}
