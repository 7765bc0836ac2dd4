//! The dispatcher: build the request, send it, decode the response.
//!
//! # Design
//! `DataProvider` holds the API base URL, a token provider and the caller's
//! transport, and nothing else. Calls share no mutable state, so one provider
//! can serve any number of concurrent calls. Errors from request building,
//! the transport and decoding are returned as they are; nothing is retried.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::request::build_request;
use crate::response::decode_response;
use crate::token::{NoToken, TokenProvider};
use crate::transport::Transport;
use crate::types::{Operation, RestResult};

pub struct DataProvider<T> {
    config: ProviderConfig,
    tokens: Box<dyn TokenProvider>,
    transport: T,
}

impl<T: Transport> DataProvider<T> {
    /// A provider that never sends an `Authorization` header.
    pub fn new(config: ProviderConfig, transport: T) -> Self {
        Self::with_tokens(config, transport, NoToken)
    }

    pub fn with_tokens(config: ProviderConfig, transport: T, tokens: impl TokenProvider + 'static) -> Self {
        Self {
            config,
            tokens: Box::new(tokens),
            transport,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Run `operation` against `resource`.
    #[instrument(skip(self, operation), fields(kind = %operation.kind()))]
    pub async fn dispatch(&self, resource: &str, operation: Operation) -> Result<RestResult, ProviderError> {
        let token = self.tokens.token();
        let request = build_request(self.config.api_url(), resource, &operation, &token)?;
        let response = self.transport.send(request).await?;
        let result = decode_response(response, &operation, resource)?;
        debug!("dispatched");
        Ok(result)
    }

    /// Run an operation given by name with JSON parameters.
    ///
    /// Unknown names fail with `UnsupportedOperation` before the transport is
    /// touched.
    pub async fn dispatch_raw(&self, kind: &str, resource: &str, params: Value) -> Result<RestResult, ProviderError> {
        let operation = Operation::from_json(kind, params)?;
        self.dispatch(resource, operation).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};
    use crate::token::StaticToken;
    use crate::transport::TransportError;

    /// Records every request and answers with a canned response.
    struct Canned {
        reply: Result<HttpResponse, TransportError>,
        seen: Mutex<Vec<HttpRequest>>,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new(reply: Result<HttpResponse, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Transport for Canned {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    fn provider(transport: Arc<Canned>) -> DataProvider<Arc<Canned>> {
        DataProvider::new(ProviderConfig::new("http://api.test/"), transport)
    }

    #[tokio::test]
    async fn list_round_trip() {
        let transport = Canned::new(Ok(HttpResponse::new(
            vec![("Content-Range".to_string(), "10-19/*".to_string())],
            json!([{ "id": 11 }]),
        )));
        let result = provider(transport.clone())
            .dispatch_raw(
                "GET_LIST",
                "posts",
                json!({
                    "pagination": { "page": 2, "perPage": 10 },
                    "sort": { "field": "id", "order": "ASC" },
                    "filter": {}
                }),
            )
            .await
            .unwrap();

        assert_eq!(result.total(), Some(20));
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].method, HttpMethod::Get);
        assert_eq!(seen[0].url, "http://api.test/posts?order=id.asc");
        assert_eq!(seen[0].header("Range"), Some("10-19"));
    }

    #[tokio::test]
    async fn unsupported_kind_never_reaches_transport() {
        let transport = Canned::new(Ok(HttpResponse::new(Vec::new(), Value::Null)));
        let err = provider(transport.clone())
            .dispatch_raw("UPSERT", "posts", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedOperation(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transport_error_passes_through() {
        let failure = TransportError::Status {
            status: 409,
            body: "conflict".to_string(),
        };
        let transport = Canned::new(Err(failure.clone()));
        let err = provider(transport)
            .dispatch_raw("DELETE", "posts", json!({ "id": 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Transport(inner) if inner == failure));
    }

    #[tokio::test]
    async fn token_is_read_per_request() {
        let transport = Canned::new(Ok(HttpResponse::new(Vec::new(), json!({ "id": 1 }))));
        let provider = DataProvider::with_tokens(
            ProviderConfig::new("http://api.test"),
            transport.clone(),
            StaticToken::new("a-token-longer-than-sixteen"),
        );
        provider.dispatch_raw("GET_ONE", "posts", json!({ "id": 1 })).await.unwrap();
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].header("Authorization"), Some("Bearer a-token-longer-than-sixteen"));
    }

    #[tokio::test]
    async fn missing_content_range_is_reported() {
        let transport = Canned::new(Ok(HttpResponse::new(Vec::new(), json!([]))));
        let err = provider(transport)
            .dispatch_raw(
                "GET_MANY_REFERENCE",
                "comments",
                json!({ "target": "post_id", "id": 3, "sort": { "field": "id", "order": "asc" } }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MissingRangeHeader));
    }
}
