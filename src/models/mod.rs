//! Core data models for canonical documents and search operations.

mod document;
mod search;

pub use document::{Document, DocumentBuilder, OpenAccessInfo, SourceKind};
pub use search::{
    GetDocumentRequest, Pagination, ParseFailure, ProviderQuery, ProviderResults, SearchRequest,
    SearchResult,
};
