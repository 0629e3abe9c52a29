use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::services::MessagingError;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// HTTP face of [`MessagingError`]. Server-side failures are logged and
/// answered with an opaque message.
#[derive(Debug)]
pub struct ApiError(pub MessagingError);

impl From<MessagingError> for ApiError {
    fn from(e: MessagingError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            MessagingError::InvalidUsername(_)
            | MessagingError::SelfMessage
            | MessagingError::EmptyContent
            | MessagingError::ContentTooLong { .. }
            | MessagingError::AlreadyDeleted => StatusCode::BAD_REQUEST,
            MessagingError::NotAParticipant(_) => StatusCode::FORBIDDEN,
            MessagingError::TargetNotFound(_) | MessagingError::NotFound => StatusCode::NOT_FOUND,
            MessagingError::Gone => StatusCode::GONE,
            MessagingError::Timeout(_) | MessagingError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self.0, "Messaging request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "Messaging request rejected");
            self.0.to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
