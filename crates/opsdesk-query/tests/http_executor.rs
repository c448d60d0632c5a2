use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use opsdesk_query::{
    resources, ClientSettings, Endpoint, FetchError, FetchExecutor, HttpExecutor, QueryOptions,
    QueryParams, Subscription,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

fn executor(server: &MockServer) -> HttpExecutor {
    let settings = ClientSettings::default().with_timeout(Duration::from_secs(5));
    HttpExecutor::new(server.base_url(), &settings).expect("client")
}

#[tokio::test]
async fn success_returns_parsed_json() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/admin/models")
                .query_param("limit", "5")
                .header("authorization", "Bearer s3cret");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "data": [{ "id": "m1" }] }));
        })
        .await;

    let exec = executor(&server).with_admin_token(Some(" s3cret ".into()));
    let endpoint = Endpoint::get("/admin/models").with_query([("limit", "5")]);
    let value = exec
        .execute(&endpoint, &CancellationToken::new())
        .await
        .expect("ok");

    assert_eq!(value, json!({ "data": [{ "id": "m1" }] }));
    mock.assert_async().await;
}

#[tokio::test]
async fn empty_body_is_null() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/admin/telemetry/rum");
            then.status(204);
        })
        .await;

    let value = executor(&server)
        .execute(&Endpoint::get("/admin/telemetry/rum"), &CancellationToken::new())
        .await
        .expect("ok");
    assert_eq!(value, Value::Null);
}

#[tokio::test]
async fn error_status_carries_server_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/admin/billing/overview");
            then.status(403)
                .header("content-type", "application/json")
                .json_body(json!({ "error": { "message": "admin token required" } }));
        })
        .await;

    let err = executor(&server)
        .execute(&Endpoint::get("/admin/billing/overview"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(err.to_string(), "admin token required");
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/admin/telemetry/llm");
            then.status(200).body("{not json");
        })
        .await;

    let err = executor(&server)
        .execute(&Endpoint::get("/admin/telemetry/llm"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn cancelled_token_aborts_without_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/admin/telemetry/http");
            then.status(200).json_body(json!({}));
        })
        .await;

    let token = CancellationToken::new();
    token.cancel();
    let err = executor(&server)
        .execute(&Endpoint::get("/admin/telemetry/http"), &token)
        .await
        .unwrap_err();
    assert!(err.is_aborted());
    mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn cancellation_interrupts_slow_response() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/admin/telemetry/workers");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(json!({ "workers": [] }));
        })
        .await;

    let exec = executor(&server);
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    let err = exec
        .execute(&Endpoint::get("/admin/telemetry/workers"), &token)
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Aborted);
}

#[tokio::test]
async fn subscription_normalizes_http_summary() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/admin/telemetry/http")
                .query_param("window", "1h");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "data": {
                        "window": "1h",
                        "paths": [
                            { "method": "get", "path": "/v1/users", "avg_duration_ms": "12.5" },
                            { "method": null, "path": "/x" }
                        ]
                    }
                }));
        })
        .await;

    let exec: Arc<dyn FetchExecutor> = Arc::new(executor(&server));
    let sub = Subscription::activate(
        resources::http(exec),
        QueryParams::new().with("window", "1h"),
        QueryOptions::new(),
    );
    let summary = sub.refresh().await.expect("summary");

    assert_eq!(summary.window.as_deref(), Some("1h"));
    assert_eq!(summary.paths.len(), 1);
    assert_eq!(summary.paths[0].method, "GET");
    assert_eq!(summary.paths[0].avg_duration_ms, 12.5);
    assert_eq!(sub.state().data, Some(summary));
}
