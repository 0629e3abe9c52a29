use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use tower::ServiceExt;

use anonsocial::application::services::MessagingService;
use anonsocial::domain::Username;
use anonsocial::infrastructure::persistence::{InMemoryConversationStore, InMemoryUserDirectory};
use anonsocial::presentation::config::{
    DatabaseSettings, LoggingSettings, MessagingSettings, ServerSettings,
};
use anonsocial::presentation::{AppState, Settings, create_router};

fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        database: DatabaseSettings {
            url: "postgres://localhost/test".to_string(),
            max_connections: 1,
            acquire_timeout_seconds: 1,
            run_migrations: false,
        },
        messaging: MessagingSettings {
            store_timeout_ms: 1000,
            max_write_attempts: 3,
        },
        logging: LoggingSettings {
            level: "debug".to_string(),
            enable_json: false,
        },
    }
}

fn create_test_app() -> axum::Router {
    let settings = test_settings();
    let users = ["alice", "bob", "carol"]
        .into_iter()
        .map(|name| Username::parse(name).unwrap());

    let messaging_service = Arc::new(MessagingService::new(
        Arc::new(InMemoryConversationStore::new()),
        Arc::new(InMemoryUserDirectory::with_users(users)),
        Duration::from_millis(settings.messaging.store_timeout_ms),
        settings.messaging.max_write_attempts,
    ));

    create_router(AppState {
        messaging_service,
        settings,
    })
}

fn request_as(user: &str, method: &str, uri: &str, body: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-authenticated-user", user);

    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &axum::Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn given_running_server_when_health_check_then_returns_ok() {
    let app = create_test_app();

    let response = send(
        &app,
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn given_missing_identity_when_listing_then_returns_unauthorized() {
    let app = create_test_app();

    let response = send(
        &app,
        Request::builder()
            .uri("/api/v1/messages")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn given_malformed_identity_when_listing_then_returns_unauthorized() {
    let app = create_test_app();

    let response = send(&app, request_as("not valid!", "GET", "/api/v1/messages", None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn given_unparseable_role_header_when_listing_then_request_still_succeeds() {
    let app = create_test_app();
    let mut request = request_as("alice", "GET", "/api/v1/messages", None);
    request
        .headers_mut()
        .insert("x-authenticated-role", "admin".parse().unwrap());

    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn given_valid_message_when_sending_then_returns_conversation() {
    let app = create_test_app();

    let response = send(
        &app,
        request_as(
            "bob",
            "POST",
            "/api/v1/messages/alice",
            Some(r#"{"content":"hello alice"}"#),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["id"].is_string());
    assert_eq!(body["participants"], serde_json::json!(["alice", "bob"]));
    assert_eq!(body["messages"][0]["sender"], "bob");
    assert_eq!(body["messages"][0]["content"], "hello alice");
    assert_eq!(body["unreadCounts"]["alice"], 1);
    assert_eq!(body["unreadCounts"]["bob"], 0);
    assert!(body.get("deletedBy").is_none());
}

#[tokio::test]
async fn given_self_as_target_when_sending_then_returns_bad_request() {
    let app = create_test_app();

    let response = send(
        &app,
        request_as("alice", "POST", "/api/v1/messages/alice", Some(r#"{"content":"me"}"#)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_unknown_target_when_sending_then_returns_not_found() {
    let app = create_test_app();

    let response = send(
        &app,
        request_as("alice", "POST", "/api/v1/messages/ghost", Some(r#"{"content":"hi"}"#)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn given_malformed_target_when_getting_then_returns_bad_request() {
    let app = create_test_app();

    let response = send(&app, request_as("alice", "GET", "/api/v1/messages/a", None)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_over_long_content_when_sending_then_returns_bad_request() {
    let app = create_test_app();
    let body = serde_json::json!({ "content": "a".repeat(501) }).to_string();

    let response = send(
        &app,
        request_as("alice", "POST", "/api/v1/messages/bob", Some(&body)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_malformed_body_when_sending_then_returns_bad_request() {
    let app = create_test_app();

    let response = send(
        &app,
        request_as("alice", "POST", "/api/v1/messages/bob", Some(r#"{"text":"hi"}"#)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn given_no_history_when_getting_conversation_then_returns_unsaved_view() {
    let app = create_test_app();

    let response = send(&app, request_as("alice", "GET", "/api/v1/messages/bob", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body.get("id").is_none());
    assert_eq!(body["messages"], serde_json::json!([]));
    assert_eq!(body["unreadCounts"]["alice"], 0);
}

#[tokio::test]
async fn given_unread_messages_when_marking_read_then_unread_count_drops() {
    let app = create_test_app();
    for content in ["one", "two"] {
        let body = serde_json::json!({ "content": content }).to_string();
        send(
            &app,
            request_as("bob", "POST", "/api/v1/messages/alice", Some(&body)),
        )
        .await;
    }

    let before = send(
        &app,
        request_as("alice", "GET", "/api/v1/messages/unread-count", None),
    )
    .await;
    assert_eq!(before.status(), StatusCode::OK);
    assert_eq!(json_body(before).await["unreadCount"], 2);

    let read = send(
        &app,
        request_as("alice", "POST", "/api/v1/messages/bob/read", None),
    )
    .await;
    assert_eq!(read.status(), StatusCode::OK);
    assert_eq!(json_body(read).await["message"], "Messages marked as read");

    let after = send(
        &app,
        request_as("alice", "GET", "/api/v1/messages/unread-count", None),
    )
    .await;
    assert_eq!(json_body(after).await["unreadCount"], 0);
}

#[tokio::test]
async fn given_conversations_when_listing_then_returns_latest_message_per_conversation() {
    let app = create_test_app();
    for content in ["first", "second"] {
        let body = serde_json::json!({ "content": content }).to_string();
        send(
            &app,
            request_as("bob", "POST", "/api/v1/messages/alice", Some(&body)),
        )
        .await;
    }
    send(
        &app,
        request_as("carol", "POST", "/api/v1/messages/alice", Some(r#"{"content":"yo"}"#)),
    )
    .await;

    let response = send(&app, request_as("alice", "GET", "/api/v1/messages", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["messages"][0]["content"], "yo");
    assert_eq!(list[1]["messages"].as_array().unwrap().len(), 1);
    assert_eq!(list[1]["messages"][0]["content"], "second");
}

#[tokio::test]
async fn given_deleted_conversation_when_getting_then_returns_gone() {
    let app = create_test_app();
    send(
        &app,
        request_as("alice", "POST", "/api/v1/messages/bob", Some(r#"{"content":"hi"}"#)),
    )
    .await;

    let deleted = send(&app, request_as("alice", "DELETE", "/api/v1/messages/bob", None)).await;
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(json_body(deleted).await["message"], "Conversation deleted");

    let gone = send(&app, request_as("alice", "GET", "/api/v1/messages/bob", None)).await;
    assert_eq!(gone.status(), StatusCode::GONE);

    let still_visible = send(&app, request_as("bob", "GET", "/api/v1/messages/alice", None)).await;
    assert_eq!(still_visible.status(), StatusCode::OK);
    assert_eq!(json_body(still_visible).await["deletedBy"], serde_json::json!(["alice"]));

    let again = send(&app, request_as("alice", "DELETE", "/api/v1/messages/bob", None)).await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_no_conversation_when_deleting_then_returns_not_found() {
    let app = create_test_app();

    let response = send(&app, request_as("alice", "DELETE", "/api/v1/messages/bob", None)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn given_request_with_id_when_any_endpoint_then_response_echoes_request_id() {
    let app = create_test_app();

    let response = send(
        &app,
        Request::builder()
            .uri("/health")
            .header("x-request-id", "my-custom-id-123")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "my-custom-id-123"
    );
}

#[tokio::test]
async fn given_request_without_id_when_any_endpoint_then_response_contains_request_id() {
    let app = create_test_app();

    let response = send(
        &app,
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert!(response.headers().contains_key("x-request-id"));
}
