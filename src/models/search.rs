//! Search request and response models.

use serde::{Deserialize, Serialize};

use crate::models::{Document, SourceKind};

/// An aggregate search request as received by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Search query string (required, non-empty)
    pub query: String,

    /// Providers to fan out to; defaults to all known providers
    #[serde(default = "SourceKind::all_searchable")]
    pub sources: Vec<SourceKind>,

    /// Result limit; defaults to the configured search limit, must be >= 1
    #[serde(default)]
    pub limit: Option<usize>,

    /// Result offset for pagination
    #[serde(default)]
    pub offset: usize,

    /// Start year for the publication filter (inclusive)
    #[serde(default)]
    pub year_from: Option<i32>,

    /// End year for the publication filter (inclusive)
    #[serde(default)]
    pub year_to: Option<i32>,

    /// Case-insensitive journal substring filter
    #[serde(default)]
    pub journal: Option<String>,

    /// Keep only records with a known PDF location
    #[serde(default)]
    pub pdf_only: bool,

    /// Keep only records with extracted full text
    #[serde(default)]
    pub full_text_only: bool,

    /// Attempt open-access PDF resolution for records without a PDF
    #[serde(default = "default_true")]
    pub resolve_pdfs: bool,
}

impl SearchRequest {
    /// Create a request with defaults for everything but the query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sources: SourceKind::all_searchable(),
            limit: None,
            offset: 0,
            year_from: None,
            year_to: None,
            journal: None,
            pdf_only: false,
            full_text_only: false,
            resolve_pdfs: true,
        }
    }

    pub fn sources(mut self, sources: Vec<SourceKind>) -> Self {
        self.sources = sources;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn year_range(mut self, from: Option<i32>, to: Option<i32>) -> Self {
        self.year_from = from;
        self.year_to = to;
        self
    }

    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.journal = Some(journal.into());
        self
    }

    pub fn pdf_only(mut self, pdf_only: bool) -> Self {
        self.pdf_only = pdf_only;
        self
    }

    pub fn resolve_pdfs(mut self, resolve: bool) -> Self {
        self.resolve_pdfs = resolve;
        self
    }
}

fn default_true() -> bool {
    true
}

/// A single-document lookup request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDocumentRequest {
    /// Provider-scoped identifier
    #[serde(default)]
    pub result_id: Option<String>,

    /// Provider hint; inferred from the identifier shape when absent
    #[serde(default)]
    pub source: Option<SourceKind>,

    /// DOI of the document
    #[serde(default)]
    pub doi: Option<String>,

    /// Attempt open-access PDF resolution before returning
    #[serde(default = "default_true")]
    pub resolve_pdf: bool,
}

impl GetDocumentRequest {
    /// Lookup by DOI alone
    pub fn by_doi(doi: impl Into<String>) -> Self {
        Self {
            result_id: None,
            source: None,
            doi: Some(doi.into()),
            resolve_pdf: true,
        }
    }

    /// Lookup by provider-scoped identifier
    pub fn by_id(result_id: impl Into<String>) -> Self {
        Self {
            result_id: Some(result_id.into()),
            source: None,
            doi: None,
            resolve_pdf: true,
        }
    }

    pub fn source(mut self, source: SourceKind) -> Self {
        self.source = Some(source);
        self
    }

    pub fn resolve_pdf(mut self, resolve: bool) -> Self {
        self.resolve_pdf = resolve;
        self
    }
}

/// Query handed to a single provider adapter.
#[derive(Debug, Clone, Default)]
pub struct ProviderQuery {
    /// Query text in the provider's search syntax
    pub query: String,

    /// Maximum records to return
    pub max_results: usize,

    /// Record offset for pagination
    pub offset: usize,

    /// Start year (honored by providers with native year parameters)
    pub year_from: Option<i32>,

    /// End year (honored by providers with native year parameters)
    pub year_to: Option<i32>,

    /// Journal filter (applied inside the scholar adapter)
    pub journal: Option<String>,
}

impl ProviderQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: 10,
            ..Default::default()
        }
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn year_range(mut self, from: Option<i32>, to: Option<i32>) -> Self {
        self.year_from = from;
        self.year_to = to;
        self
    }

    pub fn journal(mut self, journal: Option<String>) -> Self {
        self.journal = journal;
        self
    }
}

/// A record that failed to parse, isolated from its siblings.
#[derive(Debug, Clone, Serialize)]
pub struct ParseFailure {
    /// Provider whose payload contained the record
    pub provider: SourceKind,

    /// Why the record was dropped
    pub message: String,
}

/// One provider's normalized page of results.
#[derive(Debug, Clone)]
pub struct ProviderResults {
    /// Query that was executed
    pub query: String,

    /// Total matches reported by the provider itself
    pub total_results: u64,

    /// Successfully parsed records
    pub records: Vec<Document>,

    /// Records dropped during parsing, collected for the caller to log
    pub failures: Vec<ParseFailure>,
}

impl ProviderResults {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            total_results: 0,
            records: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn total_results(mut self, total: u64) -> Self {
        self.total_results = total;
        self
    }

    pub fn records(mut self, records: Vec<Document>) -> Self {
        self.records = records;
        self
    }

    pub fn failures(mut self, failures: Vec<ParseFailure>) -> Self {
        self.failures = failures;
        self
    }
}

/// Pagination block computed from the post-filter record count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Pagination {
    /// Compute pagination for `total` records with the given window.
    ///
    /// A `limit` of 0 degenerates to a single page with no next flag.
    pub fn compute(total: usize, limit: usize, offset: usize) -> Self {
        if limit == 0 {
            return Self {
                current_page: 1,
                total_pages: 1,
                has_next: false,
                has_previous: offset > 0,
            };
        }
        Self {
            current_page: offset / limit + 1,
            total_pages: total.div_ceil(limit),
            has_next: offset + limit < total,
            has_previous: offset > 0,
        }
    }

    /// The block returned when the merged result set is empty.
    pub fn empty() -> Self {
        Self {
            current_page: 1,
            total_pages: 0,
            has_next: false,
            has_previous: false,
        }
    }
}

/// The merged, filtered, paginated response for an aggregate search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Query that was executed
    pub query: String,

    /// Record count after local filtering (not the sum of provider totals)
    pub total_results: u64,

    /// Records in provider-fetch order, never re-sorted
    pub results: Vec<Document>,

    /// Pagination computed from the post-filter count
    pub pagination: Pagination,
}
