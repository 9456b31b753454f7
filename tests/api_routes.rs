//! HTTP API tests against the router, without a socket

#![cfg(feature = "ssr")]

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::{hub, RecordingNotifier};
use pairchat::backend::routes::create_router;
use pairchat::backend::AppState;
use pairchat::realtime::SyncHub;
use pairchat::shared::{ParticipantId, SyncEvent};

fn app() -> (Router, SyncHub) {
    let (hub, _store) = hub(Arc::new(RecordingNotifier::default()));
    (create_router(AppState::new(hub.clone())), hub)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn next_frame<S, E>(body: &mut S) -> String
where
    S: futures_util::Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: std::fmt::Debug,
{
    let chunk = tokio::time::timeout(common::WAIT, body.next())
        .await
        .expect("no frame")
        .expect("stream ended")
        .unwrap();
    String::from_utf8(chunk.to_vec()).unwrap()
}

#[tokio::test]
async fn test_login() {
    let (app, _hub) = app();

    let (status, body) = call(&app, "POST", "/api/auth", Some(json!({"password": "nope", "userId": "user1"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Invalid password", "status": 401}));

    let (status, body) = call(&app, "POST", "/api/auth", Some(json!({"password": "hunter2", "userId": "user1"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["name"], json!("Alice"));
    assert_eq!(body["user"]["isAdmin"], json!(true));
    assert_eq!(body["user"]["online"], json!(true));
}

#[tokio::test]
async fn test_send_and_list_messages() {
    let (app, _hub) = app();

    let (status, sent) = call(
        &app,
        "POST",
        "/api/messages",
        Some(json!({"sender": "user2", "content": "hello", "contentType": "text"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["content"], json!("hello"));
    assert_eq!(sent["read"], json!(false));
    assert!(sent["id"].as_str().is_some());

    let (status, list) = call(&app, "GET", "/api/messages", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([sent]));
}

#[tokio::test]
async fn test_send_rejects_invalid_draft() {
    let (app, _hub) = app();

    let (status, body) = call(
        &app,
        "POST",
        "/api/messages",
        Some(json!({"sender": "user2", "content": "  ", "contentType": "text"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!(400));

    let (status, _) = call(
        &app,
        "POST",
        "/api/messages",
        Some(json!({"sender": "user2", "content": "", "contentType": "image"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mark_read() {
    let (app, _hub) = app();
    let (_, sent) = call(
        &app,
        "POST",
        "/api/messages",
        Some(json!({"sender": "user2", "content": "hello", "contentType": "text"})),
    )
    .await;

    let (status, _) = call(&app, "POST", "/api/messages/read", Some(json!({"messageIds": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        "POST",
        "/api/messages/read",
        Some(json!({"messageIds": [sent["id"], "unknown"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], json!(1));
    assert_eq!(body["messages"][0]["read"], json!(true));

    // Setting the flag again is harmless.
    let (status, body) = call(&app, "POST", "/api/messages/read", Some(json!({"messageIds": [sent["id"]]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], json!(1));
}

#[tokio::test]
async fn test_user_status() {
    let (app, _hub) = app();

    let (status, _) = call(&app, "GET", "/api/user-status?userId=user9", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "GET", "/api/user-status", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, "GET", "/api/user-status?userId=user2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], json!("user2"));
    assert_eq!(body["name"], json!("Bob"));
    assert_eq!(body["online"], json!(false));

    call(&app, "POST", "/api/auth", Some(json!({"password": "hunter2", "userId": "user2"}))).await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/user-status",
        Some(json!({"userId": "user2", "status": "offline"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["online"], json!(false));
    assert!(body["lastSeen"].as_str().is_some());
}

#[tokio::test]
async fn test_publish_routes() {
    let (app, hub) = app();
    let _channel = hub.connect(ParticipantId::B).await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/typing",
        Some(json!({"participantId": "user1", "isTyping": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"delivered": 1}));

    let (status, _) = call(
        &app,
        "POST",
        "/api/read-receipts",
        Some(json!({"participantId": "user1", "messageIds": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        "POST",
        "/api/read-receipts",
        Some(json!({"participantId": "user1", "messageIds": ["m1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"delivered": 1}));
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (app, _hub) = app();
    let (status, body) = call(&app, "GET", "/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], json!(404));
}

#[tokio::test]
async fn test_realtime_stream() {
    let (app, hub) = app();

    let (status, _) = call(&app, "GET", "/api/realtime", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .uri("/api/realtime?participant=user1")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body().into_data_stream();
    let frame = next_frame(&mut body).await;
    assert!(frame.starts_with(':'), "{}", frame);

    // The participant's own join is announced first.
    let frame = next_frame(&mut body).await;
    assert!(frame.contains("event: presence"), "{}", frame);

    hub.publish(SyncEvent::typing(ParticipantId::B, true)).unwrap();
    let frame = next_frame(&mut body).await;
    assert!(frame.contains("event: typing"), "{}", frame);
    assert!(frame.contains("\"isTyping\":true"), "{}", frame);

    assert_eq!(hub.disconnect(ParticipantId::A), 1);
    let frame = next_frame(&mut body).await;
    assert!(frame.contains("event: close"), "{}", frame);
}

#[tokio::test]
async fn test_hidden_realtime_stream_joins_offline() {
    let (app, hub) = app();

    let request = Request::builder()
        .uri("/api/realtime?participant=user1&hidden=true")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body().into_data_stream();
    let frame = next_frame(&mut body).await;
    assert!(frame.starts_with(':'), "{}", frame);
    let frame = next_frame(&mut body).await;
    assert!(frame.contains("event: presence"), "{}", frame);
    assert!(frame.contains("\"status\":\"offline\""), "{}", frame);

    let snapshot = hub.presence().query(ParticipantId::A).await;
    assert_eq!(snapshot.connections, 1);
    assert!(!snapshot.state.is_online());
}
