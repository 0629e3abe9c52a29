use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::infrastructure::observability::request_id_middleware;
use crate::presentation::handlers::{
    delete_conversation_handler, get_conversation_handler, health_handler,
    list_conversations_handler, mark_read_handler, send_message_handler, unread_count_handler,
};
use crate::presentation::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Static segments win over `{username}`, so `unread-count` never reaches
    // the per-user handler.
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/messages", get(list_conversations_handler))
        .route("/api/v1/messages/unread-count", get(unread_count_handler))
        .route(
            "/api/v1/messages/{username}",
            get(get_conversation_handler)
                .post(send_message_handler)
                .delete(delete_conversation_handler),
        )
        .route("/api/v1/messages/{username}/read", post(mark_read_handler))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
