//! Utility modules supporting retrieval operations.
//!
//! - [`HttpClient`]: shared HTTP client with the crate's default timeouts
//! - [`with_retry`] / [`RetryConfig`]: bounded retry with exponential backoff
//! - [`BoundedCache`]: fixed-capacity map with least-recently-inserted eviction
//! - [`parse`]: DOI, year, date, and snippet helpers shared by the adapters

mod cache;
mod http;
pub mod parse;
mod retry;

pub use cache::BoundedCache;
pub use http::HttpClient;
pub use retry::{is_transient, with_retry, RetryConfig};
