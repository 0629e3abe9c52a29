use std::collections::BTreeMap;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::application::services::MessagingError;
use crate::domain::{Conversation, Message, Username};
use crate::infrastructure::observability::sanitize_content;
use crate::presentation::state::AppState;

use super::auth::AuthenticatedUser;
use super::error::{ApiError, ErrorResponse};

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub sender: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub participants: Vec<String>,
    pub created_at: String,
    pub last_updated: String,
    pub messages: Vec<MessageResponse>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deleted_by: Vec<String>,
    pub unread_counts: BTreeMap<String, u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub unread_count: u64,
}

#[derive(Serialize)]
pub struct StatusMessageResponse {
    pub message: String,
}

impl From<&Message> for MessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            sender: message.sender.to_string(),
            content: message.content.clone(),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

impl From<&Conversation> for ConversationResponse {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id().map(|id| id.to_string()),
            participants: conversation
                .participants()
                .iter()
                .map(|p| p.to_string())
                .collect(),
            created_at: conversation.created_at().to_rfc3339(),
            last_updated: conversation.last_updated().to_rfc3339(),
            messages: conversation
                .messages()
                .iter()
                .map(MessageResponse::from)
                .collect(),
            deleted_by: conversation
                .deleted_by()
                .iter()
                .map(|u| u.to_string())
                .collect(),
            unread_counts: conversation
                .unread_counts()
                .iter()
                .map(|(user, count)| (user.to_string(), *count))
                .collect(),
        }
    }
}

fn parse_target(raw: &str) -> Result<Username, ApiError> {
    Username::parse(raw).map_err(|e| ApiError(MessagingError::InvalidUsername(e)))
}

#[tracing::instrument(skip(state, caller), fields(me = %caller.username))]
pub async fn list_conversations_handler(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let conversations = state
        .messaging_service
        .list_conversations(&caller.username)
        .await?;

    let body: Vec<ConversationResponse> = conversations
        .iter()
        .map(ConversationResponse::from)
        .collect();

    Ok((StatusCode::OK, Json(body)))
}

#[tracing::instrument(skip(state, caller), fields(me = %caller.username))]
pub async fn unread_count_handler(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let unread_count = state
        .messaging_service
        .total_unread(&caller.username)
        .await?;

    Ok((StatusCode::OK, Json(UnreadCountResponse { unread_count })))
}

#[tracing::instrument(skip(state, caller), fields(me = %caller.username))]
pub async fn get_conversation_handler(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = parse_target(&username)?;

    let conversation = state
        .messaging_service
        .get_conversation(&caller.username, &target)
        .await?;

    Ok((StatusCode::OK, Json(ConversationResponse::from(&conversation))))
}

#[tracing::instrument(skip(state, caller, payload), fields(me = %caller.username))]
pub async fn send_message_handler(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(username): Path<String>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let target = parse_target(&username)?;

    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Malformed send message body");
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: rejection.body_text(),
                }),
            )
                .into_response());
        }
    };

    tracing::debug!(preview = %sanitize_content(&request.content), "Sending message");

    let conversation = state
        .messaging_service
        .send_message(&caller.username, &target, request.content)
        .await?;

    Ok((StatusCode::OK, Json(ConversationResponse::from(&conversation))).into_response())
}

#[tracing::instrument(skip(state, caller), fields(me = %caller.username))]
pub async fn mark_read_handler(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = parse_target(&username)?;

    state
        .messaging_service
        .mark_read(&caller.username, &target)
        .await?;

    Ok((
        StatusCode::OK,
        Json(StatusMessageResponse {
            message: "Messages marked as read".to_string(),
        }),
    ))
}

#[tracing::instrument(skip(state, caller), fields(me = %caller.username))]
pub async fn delete_conversation_handler(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = parse_target(&username)?;

    state
        .messaging_service
        .delete_conversation(&caller.username, &target)
        .await?;

    Ok((
        StatusCode::OK,
        Json(StatusMessageResponse {
            message: "Conversation deleted".to_string(),
        }),
    ))
}
