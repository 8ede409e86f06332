use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result as AppResult};
use crate::server::AppState;
use crate::server::password_reset::GENERIC_RESET_MESSAGE;
use crate::users::UserRole;

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenValidationRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenValidationResponse {
    pub valid: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

pub async fn forgot_password(
    Path(role): Path<String>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let Some(role) = UserRole::parse(&role) else {
        return Err(AppError::NotFound("unknown role".into()));
    };

    if let Err(e) = app_state
        .reset_manager
        .request_reset(payload.email.trim(), role)
        .await
    {
        // Internal failures must look exactly like the success path.
        tracing::error!("forgot-password failed: {}", e);
    }

    Ok(Json(MessageResponse {
        message: GENERIC_RESET_MESSAGE.to_string(),
    }))
}

pub async fn validate_reset_token(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<TokenValidationRequest>,
) -> AppResult<Json<TokenValidationResponse>> {
    let check = app_state
        .reset_manager
        .check_token(payload.token.trim())
        .await?;
    Ok(Json(TokenValidationResponse {
        valid: check.valid,
        message: check.message.to_string(),
    }))
}

pub async fn reset_password(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    // Length is checked on the trimmed form, but the password itself is
    // stored exactly as submitted; register and login never trim either.
    if payload.new_password.trim().len() < 7 {
        return Err(AppError::BadRequest(
            "new_password must be at least 7 characters long".into(),
        ));
    }

    app_state
        .reset_manager
        .consume(payload.token.trim(), &payload.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password reset successful".to_string(),
    }))
}
