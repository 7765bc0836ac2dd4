//! Full operation lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port and runs every operation through
//! `DataProvider` with a `ureq` transport. The blocking ureq call runs on
//! `spawn_blocking` so the transport can satisfy the async `Transport` trait.

use async_trait::async_trait;
use pgrst_core::{
    DataProvider, HttpMethod, HttpRequest, HttpResponse, ProviderConfig, ProviderError, RestResult, StaticToken,
    Transport, TransportError,
};
use serde_json::{json, Value};

struct UreqTransport;

#[async_trait]
impl Transport for UreqTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        tokio::task::spawn_blocking(move || execute(request))
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Execute an `HttpRequest` with ureq, turning non-2xx statuses into errors.
fn execute(req: HttpRequest) -> Result<HttpResponse, TransportError> {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let body = req.body.unwrap_or_default();
    let result = match req.method {
        HttpMethod::Get => with_headers(agent.get(&req.url), &req.headers).call(),
        HttpMethod::Delete => with_headers(agent.delete(&req.url), &req.headers).call(),
        HttpMethod::Post => with_headers(agent.post(&req.url), &req.headers)
            .content_type("application/json")
            .send(body.as_bytes()),
        HttpMethod::Patch => with_headers(agent.patch(&req.url), &req.headers)
            .content_type("application/json")
            .send(body.as_bytes()),
    };
    let mut response = result.map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status().as_u16();
    let headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();
    let text = response.body_mut().read_to_string().unwrap_or_default();

    if !(200..300).contains(&status) {
        return Err(TransportError::Status { status, body: text });
    }
    let json = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).map_err(|e| TransportError::Network(e.to_string()))?
    };
    Ok(HttpResponse::new(headers, json))
}

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}/")
}

fn data(result: &RestResult) -> Value {
    result.to_json()["data"].clone()
}

#[tokio::test]
async fn operation_lifecycle() {
    let url = start_server();
    let provider = DataProvider::with_tokens(
        ProviderConfig::new(&url),
        UreqTransport,
        StaticToken::new("integration-test-token"),
    );

    // Step 1: list on an empty table.
    let list = json!({
        "pagination": { "page": 1, "perPage": 2 },
        "sort": { "field": "id", "order": "ASC" },
        "filter": {}
    });
    let result = provider.dispatch_raw("GET_LIST", "posts", list.clone()).await.unwrap();
    assert_eq!(result.total(), Some(0));
    assert_eq!(data(&result), json!([]));

    // Step 2: create three posts; only the server's id is adopted.
    for title in ["First: post", "Second", "Third"] {
        let result = provider
            .dispatch_raw("CREATE", "posts", json!({ "data": { "title": title, "published": false } }))
            .await
            .unwrap();
        let created = data(&result);
        assert_eq!(created["title"], title);
        assert!(created["id"].is_i64());
    }

    // Step 3: first page of two, exact total of three.
    let result = provider.dispatch_raw("GET_LIST", "posts", list).await.unwrap();
    assert_eq!(result.total(), Some(3));
    let ids: Vec<i64> = data(&result)
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2]);

    // Step 4: text filter drops the first colon before matching.
    let result = provider
        .dispatch_raw(
            "GET_LIST",
            "posts",
            json!({
                "pagination": { "page": 1, "perPage": 10 },
                "sort": { "field": "id", "order": "desc" },
                "filter": { "title": "first: p" }
            }),
        )
        .await
        .unwrap();
    assert_eq!(result.total(), Some(0));

    let result = provider
        .dispatch_raw(
            "GET_LIST",
            "posts",
            json!({
                "pagination": { "page": 1, "perPage": 10 },
                "sort": { "field": "id", "order": "desc" },
                "filter": { "published": false, "title": "ir" }
            }),
        )
        .await
        .unwrap();
    assert_eq!(result.total(), Some(2));

    // Step 5: get one.
    let result = provider.dispatch_raw("GET_ONE", "posts", json!({ "id": 2 })).await.unwrap();
    assert_eq!(data(&result)["title"], "Second");

    // Step 6: get many keeps the server's order.
    let result = provider.dispatch_raw("GET_MANY", "posts", json!({ "ids": [3, 1] })).await.unwrap();
    assert_eq!(data(&result).as_array().unwrap().len(), 2);

    // Step 7: update returns the server's representation.
    let result = provider
        .dispatch_raw("UPDATE", "posts", json!({ "id": 2, "data": { "published": true } }))
        .await
        .unwrap();
    assert_eq!(data(&result), json!({ "id": 2, "title": "Second", "published": true }));

    // Step 8: references, total derived from the range end.
    for body in ["nice", "meh"] {
        provider
            .dispatch_raw("CREATE", "comments", json!({ "data": { "post_id": 2, "body": body } }))
            .await
            .unwrap();
    }
    let result = provider
        .dispatch_raw(
            "GET_MANY_REFERENCE",
            "comments",
            json!({ "target": "post_id", "id": 2, "sort": { "field": "id", "order": "DESC" } }),
        )
        .await
        .unwrap();
    assert_eq!(result.total(), Some(2));
    assert_eq!(data(&result)[0]["body"], "meh");

    // Step 9: delete acknowledges with an empty record.
    let result = provider.dispatch_raw("DELETE", "posts", json!({ "id": 2 })).await.unwrap();
    assert_eq!(result.to_json(), json!({ "data": {} }));

    // Step 10: get after delete; the transport's 406 comes back untouched.
    let err = provider.dispatch_raw("GET_ONE", "posts", json!({ "id": 2 })).await.unwrap_err();
    assert!(matches!(err, ProviderError::Transport(TransportError::Status { status: 406, .. })));
}

#[tokio::test]
async fn unsupported_operation_fails_without_network() {
    // Nothing listens on this port; reaching the transport would be a network error.
    let provider = DataProvider::new(ProviderConfig::new("http://127.0.0.1:9"), UreqTransport);
    let err = provider.dispatch_raw("UPSERT", "posts", json!({})).await.unwrap_err();
    assert!(matches!(err, ProviderError::UnsupportedOperation(kind) if kind == "UPSERT"));
}
