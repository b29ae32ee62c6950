//! Shared test utilities for integration tests.
//!
//! Each test spins up a throwaway axum server on `127.0.0.1:0` that plays
//! the remote agent, and talks to it with a client built with `allow_local`.

#![allow(dead_code)]

use std::convert::Infallible;
use std::time::Duration;

use a2a_recorder::client::{A2AClient, ClientBuilder};
use axum::body::{Body, Bytes};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Router;
use futures::{Stream, StreamExt};
use serde_json::{json, Value};

/// Install a test-friendly tracing subscriber (idempotent).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .try_init();
}

/// Start `app` on a random port. Returns the base URL.
pub async fn serve(app: Router) -> String {
    init_tracing();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Brief wait for the server to start accepting connections.
    tokio::time::sleep(Duration::from_millis(20)).await;

    format!("http://{}", addr)
}

/// A client for a local mock agent.
pub fn local_client(base_url: &str) -> A2AClient {
    ClientBuilder::new(base_url)
        .with_allow_local(true)
        .build()
        .unwrap()
}

/// A response with an explicit content type.
pub fn response_with(status: StatusCode, content_type: &str, body: impl Into<Body>) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap()
}

/// `200 application/json` response.
pub fn json_response(body: impl Into<Body>) -> Response {
    response_with(StatusCode::OK, "application/json", body)
}

/// A JSON-RPC success envelope around `result`.
pub fn rpc_result(result: Value) -> String {
    json!({"jsonrpc": "2.0", "id": "1", "result": result}).to_string()
}

/// A JSON-RPC error envelope.
pub fn rpc_error(code: i64, message: &str) -> String {
    json!({"jsonrpc": "2.0", "id": "1", "error": {"code": code, "message": message}}).to_string()
}

/// A chunked body: no `Content-Length`, one frame per chunk.
pub fn chunked_body(chunks: Vec<Vec<u8>>) -> Body {
    Body::from_stream(futures::stream::iter(
        chunks.into_iter().map(|c| Ok::<_, Infallible>(Bytes::from(c))),
    ))
}

/// A chunked body that pauses before each chunk so they arrive as separate reads.
pub fn paced_body(chunks: Vec<String>, pause: Duration) -> impl Stream<Item = Result<Bytes, Infallible>> {
    futures::stream::iter(chunks).then(move |chunk| async move {
        tokio::time::sleep(pause).await;
        Ok::<_, Infallible>(Bytes::from(chunk))
    })
}

/// `200 text/event-stream` response streaming `chunks`, then staying open
/// forever when `hold_open` is set.
pub fn sse_response(chunks: Vec<String>, hold_open: bool) -> Response {
    let frames = paced_body(chunks, Duration::from_millis(5));
    let body = if hold_open {
        Body::from_stream(frames.chain(futures::stream::pending()))
    } else {
        Body::from_stream(frames)
    };
    response_with(StatusCode::OK, "text/event-stream", body)
}

/// One SSE frame carrying `result` in a JSON-RPC envelope.
pub fn sse_frame(result: Value) -> String {
    format!("data: {}\n\n", rpc_result(result))
}

/// A status update event.
pub fn status_event(task_id: &str, state: &str, is_final: bool) -> Value {
    json!({
        "kind": "status-update",
        "taskId": task_id,
        "contextId": "ctx-1",
        "status": {"state": state},
        "final": is_final
    })
}

/// A task object as returned by `message/send` or `tasks/get`.
pub fn task_json(id: &str, state: &str) -> Value {
    json!({
        "kind": "task",
        "id": id,
        "contextId": "ctx-1",
        "status": {"state": state, "timestamp": "2024-01-01T00:00:00Z"},
        "history": [
            {"role": "user", "messageId": "m1", "parts": [{"kind": "text", "text": "hello"}]},
            {"role": "agent", "messageId": "m2", "parts": [{"kind": "text", "text": "hi there"}]}
        ]
    })
}

/// A minimal valid agent card.
pub fn card_json(url: &str) -> Value {
    json!({
        "name": "Test Echo Agent",
        "description": "An echo agent for testing",
        "url": url,
        "version": "0.1.0",
        "capabilities": {"streaming": true},
        "skills": [{"id": "echo", "name": "Echo", "tags": ["test"]}]
    })
}
