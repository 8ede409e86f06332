use axum::http::HeaderMap;
use chrono::Utc;

use crate::error::AppError;
use crate::server::AppState;
use crate::sessions::hash_session_token;
use crate::users::{User, UserRole};

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Resolves the caller from their bearer session. Identity is always
/// supplied by the request; there is no standing default user.
pub async fn ensure_user(headers: &HeaderMap, app_state: &AppState) -> Result<User, AppError> {
    let Some(token) = bearer_token(headers) else {
        return Err(AppError::Unauthorized("missing bearer token".into()));
    };
    let token_hash = hash_session_token(&token);

    let Some(session) = app_state.session_store.get_session(&token_hash).await? else {
        return Err(AppError::Unauthorized("invalid session".into()));
    };
    if session.revoked {
        return Err(AppError::Unauthorized("invalid session".into()));
    }
    if Utc::now() > session.expires_at {
        let _ = app_state.session_store.revoke_session(&token_hash).await?;
        return Err(AppError::Unauthorized("session expired".into()));
    }

    let Some(user) = app_state.user_store.get_user(&session.user_id).await? else {
        return Err(AppError::Unauthorized("invalid session".into()));
    };
    Ok(user)
}

pub async fn ensure_admin(headers: &HeaderMap, app_state: &AppState) -> Result<User, AppError> {
    let user = ensure_user(headers, app_state).await?;
    if user.role != UserRole::Admin {
        return Err(AppError::Forbidden("admin access required".into()));
    }
    Ok(user)
}
