//! Tests for the Kagi client against a local stand-in server.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use fastgpt_proxy::error::UpstreamError;
use fastgpt_proxy::upstream::{AnswerSource, KagiClient};

/// Serve `router` on an ephemeral port and return its FastGPT URL.
async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/v0/fastgpt")
}

async fn echo_fastgpt(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bot kagi-key") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"meta": {}, "data": null, "error": [{"code": 2, "msg": "Unauthorized"}]})),
        );
    }
    let query = body["query"].as_str().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "meta": {"id": "abc", "node": "local", "ms": 1},
            "data": {"output": format!("answer to: {query}"), "tokens": 7, "references": []}
        })),
    )
}

#[tokio::test]
async fn test_query_returns_output() {
    let url = spawn(Router::new().route("/api/v0/fastgpt", post(echo_fastgpt))).await;
    let client = KagiClient::new(url, "kagi-key", 5).unwrap();

    let answer = client.query("why is the sky blue").await.unwrap();
    assert_eq!(answer, "answer to: why is the sky blue");
}

#[tokio::test]
async fn test_rejected_key_surfaces_status_and_message() {
    let url = spawn(Router::new().route("/api/v0/fastgpt", post(echo_fastgpt))).await;
    let client = KagiClient::new(url, "bad-key", 5).unwrap();

    match client.query("hi").await {
        Err(UpstreamError::Status { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Unauthorized (code 2)");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_output_is_malformed() {
    let router = Router::new().route(
        "/api/v0/fastgpt",
        post(|| async { Json(json!({"meta": {}, "data": {"tokens": 0}})) }),
    );
    let client = KagiClient::new(spawn(router).await, "kagi-key", 5).unwrap();

    assert!(matches!(
        client.query("hi").await,
        Err(UpstreamError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let router = Router::new().route("/api/v0/fastgpt", post(|| async { "<html>oops</html>" }));
    let client = KagiClient::new(spawn(router).await, "kagi-key", 5).unwrap();

    assert!(matches!(
        client.query("hi").await,
        Err(UpstreamError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_server_error_status() {
    let router = Router::new().route(
        "/api/v0/fastgpt",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
    );
    let client = KagiClient::new(spawn(router).await, "kagi-key", 5).unwrap();

    match client.query("hi").await {
        Err(UpstreamError::Status { status, message }) => {
            assert_eq!(status, 502);
            assert_eq!(message, "upstream down");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let router = Router::new().route(
        "/api/v0/fastgpt",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"data": {"output": "late"}}))
        }),
    );
    let client = KagiClient::new(spawn(router).await, "kagi-key", 1).unwrap();

    assert!(matches!(
        client.query("hi").await,
        Err(UpstreamError::Timeout(1))
    ));
}
