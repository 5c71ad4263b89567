use std::time::Duration;

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use bytes::Bytes;
use inference_query::{EndpointConfig, InferenceClient, QueryPayload, RestErrorKind};
use sonic_rs::{JsonValueTrait, Value, json};
use tokio::net::TcpListener;
use tokio::time::sleep;

const TOKEN: &str = "hf_e2e_token";

#[tokio::test]
async fn e2e_example_payload_roundtrip() {
    let server = TestServer::start().await;
    let client = InferenceClient::new(EndpointConfig::new(server.url("/echo"), TOKEN));

    let result = client
        .query(&QueryPayload::new("A coffee shop with organic beans and pastries"))
        .await
        .expect("echo endpoint should answer with json");

    assert_eq!(
        result["generated_text"].as_str(),
        Some("A coffee shop with organic beans and pastries")
    );
}

#[tokio::test]
async fn e2e_missing_headers_are_visible_in_status() {
    let server = TestServer::start().await;
    let client = InferenceClient::new(EndpointConfig::new(server.url("/echo"), "wrong"));

    let response = client
        .query_response(&QueryPayload::new("bakery"))
        .await
        .expect("401 with json body is still a response");

    assert_eq!(response.status, 401);
    assert_eq!(response.body, json!({"error": "unauthorized"}));
}

#[tokio::test]
async fn e2e_server_error_body_is_returned() {
    let server = TestServer::start().await;
    let client = InferenceClient::new(EndpointConfig::new(server.url("/fail"), TOKEN));

    let result = client
        .query(&QueryPayload::new("bakery"))
        .await
        .expect("500 with json body should not fail");

    assert_eq!(result, json!({"error": "internal"}));
}

#[tokio::test]
async fn e2e_plain_text_body_fails_to_parse() {
    let server = TestServer::start().await;
    let client = InferenceClient::new(EndpointConfig::new(server.url("/text"), TOKEN));

    let err = client
        .query(&QueryPayload::new("bakery"))
        .await
        .expect_err("plain text should not parse");

    assert_eq!(err.kind(), RestErrorKind::Parse);
}

#[tokio::test]
async fn e2e_connection_refused_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let url = format!("http://{addr}/echo");
    let client = InferenceClient::new(EndpointConfig::new(url, TOKEN));
    let err = client
        .query(&QueryPayload::new("bakery"))
        .await
        .expect_err("nothing is listening");

    assert_eq!(err.kind(), RestErrorKind::Connect);
}

#[tokio::test]
async fn e2e_configured_timeout_triggers() {
    let server = TestServer::start().await;
    let config =
        EndpointConfig::new(server.url("/slow"), TOKEN).with_timeout(Duration::from_millis(200));
    let client = InferenceClient::new(config);

    let err = client
        .query(&QueryPayload::new("bakery"))
        .await
        .expect_err("slow endpoint should time out");

    assert_eq!(err.kind(), RestErrorKind::Timeout);
}

struct TestServer {
    base_url: String,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let app = Router::new()
            .route("/echo", post(echo_handler))
            .route("/fail", post(fail_handler))
            .route("/text", post(text_handler))
            .route("/slow", post(slow_handler));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{}", addr);

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { base_url, task }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn header_is(headers: &HeaderMap, name: &str, expected: &str) -> bool {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected)
}

async fn echo_handler(headers: HeaderMap, body: Bytes) -> (StatusCode, String) {
    let authorized = header_is(&headers, "authorization", &format!("Bearer {TOKEN}"))
        && header_is(&headers, "accept", "application/json")
        && header_is(&headers, "content-type", "application/json");
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            r#"{"error":"unauthorized"}"#.to_string(),
        );
    }

    let Ok(payload) = sonic_rs::from_slice::<Value>(&body) else {
        return (StatusCode::BAD_REQUEST, r#"{"error":"bad json"}"#.to_string());
    };
    let description = payload["business_description"].as_str().unwrap_or_default();
    let reply = json!({ "generated_text": description });
    (
        StatusCode::OK,
        sonic_rs::to_string(&reply).unwrap_or_default(),
    )
}

async fn fail_handler() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"internal"}"#)
}

async fn text_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "not json")
}

async fn slow_handler() -> (StatusCode, &'static str) {
    sleep(Duration::from_millis(2000)).await;
    (StatusCode::OK, r#"{"generated_text":"late"}"#)
}
