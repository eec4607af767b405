use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderValue},
};

use super::state::AppState;
use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

const MAX_USER_ID_LEN: usize = 128;

/// The user a request acts for: the `X-User-Id` header, or the configured default.
///
/// There is no authentication; the header is trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

pub fn resolve_user_id(header: Option<&HeaderValue>, default_user_id: &str) -> Result<String, AppError> {
    let Some(value) = header else {
        return Ok(default_user_id.to_string());
    };

    let id = value
        .to_str()
        .map_err(|_| AppError::Validation("X-User-Id header is not valid text".to_string()))?
        .trim();

    if id.is_empty() {
        return Ok(default_user_id.to_string());
    }
    if id.len() > MAX_USER_ID_LEN
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(format!("Invalid user id '{}'", id)));
    }
    Ok(id.to_string())
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve_user_id(parts.headers.get(USER_ID_HEADER), &state.default_user_id).map(CurrentUser)
    }
}
