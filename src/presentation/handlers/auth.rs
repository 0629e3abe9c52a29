use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::domain::Username;

use super::error::ErrorResponse;

pub const AUTHENTICATED_USER_HEADER: &str = "x-authenticated-user";

/// Caller identity forwarded by the auth gateway after token verification.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: Username,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_username = parts
            .headers
            .get(AUTHENTICATED_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| unauthorized("Authentication required"))?;

        let username = Username::parse(raw_username).map_err(|e| {
            tracing::warn!(error = %e, "Rejected malformed caller identity");
            unauthorized("Invalid caller identity")
        })?;

        Ok(Self { username })
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
