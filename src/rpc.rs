//! Request dispatcher: method-named envelopes in, result/error
//! envelopes out.
//!
//! This is the single place where internal failures become stable
//! external error codes; whatever else goes wrong, the caller always
//! receives a well-formed envelope.

use serde_json::{json, Value};

use crate::aggregator::Aggregator;
use crate::config::Config;
use crate::error::RetrievalError;
use crate::models::{GetDocumentRequest, SearchRequest};

/// Stable error codes of the external envelope.
pub mod error_codes {
    /// Malformed request envelope
    pub const INVALID_REQUEST: i64 = -32600;
    /// Unknown method
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid method parameters
    pub const INVALID_PARAMS: i64 = -32602;
    /// Missing or invalid configuration
    pub const CONFIGURATION_ERROR: i64 = -32603;
    /// Upstream provider failure
    pub const API_ERROR: i64 = -32001;
    /// Lookup exhausted every provider
    pub const RESOURCE_NOT_FOUND: i64 = -32002;
    /// Rate limit exceeded
    pub const RATE_LIMIT_EXCEEDED: i64 = -32003;
    /// Unclassified server error
    pub const SERVER_ERROR: i64 = -32000;
}

/// Dispatches envelopes to the aggregator, holding the configuration the
/// per-request aggregator is constructed from.
#[derive(Debug)]
pub struct Dispatcher {
    config: Config,
}

impl Dispatcher {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Process one `{method, params, id}` request envelope.
    pub async fn process(&self, request: Value) -> Value {
        let Some(envelope) = request.as_object() else {
            return error_response(Value::Null, error_codes::INVALID_REQUEST, "Invalid Request");
        };

        let id = envelope.get("id").cloned().unwrap_or(Value::Null);
        let method = envelope.get("method").and_then(|m| m.as_str());
        let params = envelope.get("params").cloned().unwrap_or_else(|| json!({}));

        match method {
            Some("search") => self.dispatch_search(id, params).await,
            Some("get_document") => self.dispatch_get_document(id, params).await,
            other => error_response(
                id,
                error_codes::METHOD_NOT_FOUND,
                &format!("Method '{}' not found", other.unwrap_or("null")),
            ),
        }
    }

    async fn dispatch_search(&self, id: Value, params: Value) -> Value {
        let request: SearchRequest = match serde_json::from_value(params) {
            Ok(request) => request,
            Err(e) => {
                return error_response(
                    id,
                    error_codes::INVALID_PARAMS,
                    &format!("Invalid params: {}", e),
                )
            }
        };

        let outcome = match Aggregator::new(&self.config) {
            Ok(aggregator) => aggregator.search(&request).await.and_then(|result| {
                serde_json::to_value(result).map_err(RetrievalError::from)
            }),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => result_response(id, result),
            Err(e) => {
                let (code, message) = classify(&e);
                error_response(id, code, &message)
            }
        }
    }

    async fn dispatch_get_document(&self, id: Value, params: Value) -> Value {
        let request: GetDocumentRequest = match serde_json::from_value(params) {
            Ok(request) => request,
            Err(e) => {
                return error_response(
                    id,
                    error_codes::INVALID_PARAMS,
                    &format!("Invalid params: {}", e),
                )
            }
        };

        let outcome = match Aggregator::new(&self.config) {
            Ok(aggregator) => aggregator.get_document(&request).await.and_then(|doc| {
                serde_json::to_value(doc).map_err(RetrievalError::from)
            }),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => result_response(id, result),
            Err(e) => {
                let (code, message) = classify(&e);
                error_response(id, code, &message)
            }
        }
    }
}

/// Map an internal error to its external code and prefixed message.
fn classify(error: &RetrievalError) -> (i64, String) {
    match error {
        RetrievalError::Configuration(e) => (
            error_codes::CONFIGURATION_ERROR,
            format!("Configuration error: {}", e),
        ),
        RetrievalError::Validation(e) => {
            (error_codes::INVALID_PARAMS, format!("Invalid params: {}", e))
        }
        RetrievalError::Api(e) => (error_codes::API_ERROR, format!("API error: {}", e)),
        RetrievalError::NotFound(e) => (
            error_codes::RESOURCE_NOT_FOUND,
            format!("Resource not found: {}", e),
        ),
        RetrievalError::RateLimit(e) => (
            error_codes::RATE_LIMIT_EXCEEDED,
            format!("Rate limit exceeded: {}", e),
        ),
        RetrievalError::Internal(e) => (error_codes::SERVER_ERROR, format!("Server error: {}", e)),
    }
}

fn result_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PubMedConfig, TuningConfig};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Config {
            scholar: None,
            pubmed: Some(PubMedConfig {
                email: "someone@example.org".to_string(),
                api_key: None,
                tool: "scholar-search".to_string(),
            }),
            unpaywall: None,
            tuning: TuningConfig::default(),
        })
    }

    fn error_of(response: &Value) -> (i64, String) {
        let error = &response["error"];
        (
            error["code"].as_i64().unwrap(),
            error["message"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn test_non_object_envelope() {
        let response = dispatcher().process(json!("not an object")).await;
        let (code, message) = error_of(&response);
        assert_eq!(code, error_codes::INVALID_REQUEST);
        assert_eq!(message, "Invalid Request");
        assert_eq!(response["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = dispatcher()
            .process(json!({"method": "delete_everything", "params": {}, "id": 7}))
            .await;
        let (code, message) = error_of(&response);
        assert_eq!(code, error_codes::METHOD_NOT_FOUND);
        assert!(message.contains("delete_everything"));
        assert_eq!(response["id"], json!(7));
    }

    #[tokio::test]
    async fn test_missing_method() {
        let response = dispatcher().process(json!({"params": {}, "id": 1})).await;
        let (code, _) = error_of(&response);
        assert_eq!(code, error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_missing_query_is_invalid_params() {
        let response = dispatcher()
            .process(json!({"method": "search", "params": {}, "id": 2}))
            .await;
        let (code, message) = error_of(&response);
        assert_eq!(code, error_codes::INVALID_PARAMS);
        assert!(message.starts_with("Invalid params:"));
    }

    #[tokio::test]
    async fn test_search_zero_limit_is_invalid_params() {
        let response = dispatcher()
            .process(json!({
                "method": "search",
                "params": {"query": "x", "limit": 0, "sources": []},
                "id": 3
            }))
            .await;
        let (code, message) = error_of(&response);
        assert_eq!(code, error_codes::INVALID_PARAMS);
        assert!(message.contains("positive integer"));
    }

    #[tokio::test]
    async fn test_configuration_error_code() {
        let dispatcher = Dispatcher::new(Config {
            scholar: None,
            pubmed: None,
            unpaywall: None,
            tuning: TuningConfig::default(),
        });

        let response = dispatcher
            .process(json!({"method": "search", "params": {"query": "x"}, "id": 4}))
            .await;
        let (code, message) = error_of(&response);
        assert_eq!(code, error_codes::CONFIGURATION_ERROR);
        assert!(message.starts_with("Configuration error:"));
    }

    #[tokio::test]
    async fn test_get_document_without_keys_is_invalid_params() {
        let response = dispatcher()
            .process(json!({"method": "get_document", "params": {}, "id": 5}))
            .await;
        let (code, message) = error_of(&response);
        assert_eq!(code, error_codes::INVALID_PARAMS);
        assert!(message.contains("result_id or DOI"));
    }

    #[tokio::test]
    async fn test_empty_fanout_returns_result_envelope() {
        // No requested sources means no network traffic and an empty,
        // well-formed result.
        let response = dispatcher()
            .process(json!({
                "method": "search",
                "params": {"query": "quantum computing", "sources": []},
                "id": 6
            }))
            .await;

        assert_eq!(response["jsonrpc"], json!("2.0"));
        assert_eq!(response["id"], json!(6));
        let result = &response["result"];
        assert_eq!(result["total_results"], json!(0));
        assert_eq!(result["pagination"]["total_pages"], json!(0));
        assert_eq!(result["results"], json!([]));
    }
}
