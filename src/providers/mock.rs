//! Mock provider for testing the aggregator without network access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::{Document, ProviderQuery, ProviderResults, SourceKind};
use crate::providers::{Provider, ProviderCapabilities, ProviderError};

/// A provider that returns predefined responses and counts its calls.
#[derive(Debug)]
pub struct MockProvider {
    kind: SourceKind,
    records: Mutex<Vec<Document>>,
    total_results: Mutex<Option<u64>>,
    search_error: Mutex<Option<String>>,
    documents: Mutex<HashMap<String, Document>>,
    search_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            records: Mutex::new(Vec::new()),
            total_results: Mutex::new(None),
            search_error: Mutex::new(None),
            documents: Mutex::new(HashMap::new()),
            search_calls: AtomicUsize::new(0),
        }
    }

    /// Configure the records every search returns. The reported total
    /// defaults to the record count unless overridden.
    pub fn set_records(&self, records: Vec<Document>) {
        *self.records.lock().unwrap() = records;
    }

    /// Override the provider-reported total
    pub fn set_total_results(&self, total: u64) {
        *self.total_results.lock().unwrap() = Some(total);
    }

    /// Make every search fail with an API error
    pub fn set_search_error(&self, message: impl Into<String>) {
        *self.search_error.lock().unwrap() = Some(message.into());
    }

    /// Register a document for identifier lookups
    pub fn set_document(&self, id: impl Into<String>, document: Document) {
        self.documents.lock().unwrap().insert(id.into(), document);
    }

    /// How many times search (including DOI probes) was invoked
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn kind(&self) -> SourceKind {
        self.kind.clone()
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::SEARCH | ProviderCapabilities::DOI_LOOKUP | ProviderCapabilities::ID_LOOKUP
    }

    async fn search(&self, query: &ProviderQuery) -> Result<ProviderResults, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.search_error.lock().unwrap().clone() {
            return Err(ProviderError::Api(message));
        }

        let records = self.records.lock().unwrap().clone();
        let total = self
            .total_results
            .lock()
            .unwrap()
            .unwrap_or(records.len() as u64);

        Ok(ProviderResults::new(&query.query)
            .total_results(total)
            .records(records))
    }

    async fn get_by_id(&self, id: &str) -> Result<Document, ProviderError> {
        self.documents
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("{} not found in mock", id)))
    }
}

/// Build a minimal document for aggregator tests.
pub fn make_document(title: &str, source: SourceKind) -> Document {
    let mut doc = Document::new(source);
    doc.title = title.to_string();
    doc
}
