use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result as AppResult};
use crate::server::AppState;
use crate::server::auth::{bearer_token, ensure_user};
use crate::sessions::{
    SESSION_TTL_HOURS, SessionRecord, hash_session_token, issue_session_token,
};
use crate::storage::time::to_iso8601_utc_string;
use crate::users::{RegisterUserPayload, User, UserRole, verify_password};

#[derive(Debug, Serialize)]
pub struct UserOut {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserOut {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            created_at: to_iso8601_utc_string(&u.created_at),
            updated_at: to_iso8601_utc_string(&u.updated_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: String,
    pub user: UserOut,
}

pub async fn register(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<RegisterUserPayload>,
) -> AppResult<(StatusCode, Json<UserOut>)> {
    if payload.password.trim().is_empty() {
        return Err(AppError::BadRequest("password must not be empty".into()));
    }
    let user = app_state.user_store.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(UserOut::from(user))))
}

pub async fn login(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    // One message for unknown email and wrong password alike.
    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let Some(auth) = app_state
        .user_store
        .get_auth_by_email(payload.email.trim())
        .await?
    else {
        return Err(invalid());
    };
    if !verify_password(&payload.password, &auth.password_hash) {
        return Err(invalid());
    }
    let Some(user) = app_state.user_store.get_user(&auth.id).await? else {
        return Err(invalid());
    };

    let token = issue_session_token();
    let now = Utc::now();
    let expires_at = now + Duration::hours(SESSION_TTL_HOURS);
    app_state
        .session_store
        .insert_session(&SessionRecord {
            token_hash: hash_session_token(&token),
            user_id: user.id.clone(),
            created_at: now,
            expires_at,
            revoked: false,
        })
        .await?;

    Ok(Json(LoginResponse {
        token,
        expires_at: to_iso8601_utc_string(&expires_at),
        user: UserOut::from(user),
    }))
}

pub async fn logout(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    if let Some(token) = bearer_token(&headers) {
        let _ = app_state
            .session_store
            .revoke_session(&hash_session_token(&token))
            .await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<UserOut>> {
    let user = ensure_user(&headers, &app_state).await?;
    Ok(Json(UserOut::from(user)))
}
