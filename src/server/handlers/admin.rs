use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use serde::Deserialize;

use super::users::UserOut;
use crate::error::{AppError, Result as AppResult};
use crate::invoices::{DashboardReport, Invoice};
use crate::reminders::Reminder;
use crate::server::AppState;
use crate::server::auth::ensure_admin;
use crate::users::hash_password;

#[derive(Debug, Deserialize)]
pub struct AdminResetPasswordRequest {
    pub new_password: String,
}

pub async fn list_users(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<UserOut>>> {
    ensure_admin(&headers, &app_state).await?;
    let users = app_state
        .user_store
        .list_users()
        .await?
        .into_iter()
        .map(UserOut::from)
        .collect();
    Ok(Json(users))
}

pub async fn delete_user(
    Path(id): Path<String>,
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    ensure_admin(&headers, &app_state).await?;
    if !app_state.user_store.delete_user(&id).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Administrative override: overwrites the digest directly, bypassing the
/// token state machine entirely. Distinctly authorized and allowed to say
/// whether the user exists.
pub async fn reset_user_password(
    Path(id): Path<String>,
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AdminResetPasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    ensure_admin(&headers, &app_state).await?;

    if payload.new_password.trim().len() < 7 {
        return Err(AppError::BadRequest(
            "new_password must be at least 7 characters long".into(),
        ));
    }

    let digest = hash_password(&payload.new_password)?;
    if !app_state.user_store.update_password(&id, &digest).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    tracing::info!(user_id = %id, "admin password override applied");

    Ok(Json(
        serde_json::json!({ "message": "Password reset successful" }),
    ))
}

pub async fn list_invoices(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<Invoice>>> {
    ensure_admin(&headers, &app_state).await?;
    let invoices = app_state.invoice_store.list_invoices().await?;
    Ok(Json(invoices))
}

pub async fn list_reminders(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<Reminder>>> {
    ensure_admin(&headers, &app_state).await?;
    let reminders = app_state.reminder_store.list_reminders().await?;
    Ok(Json(reminders))
}

pub async fn dashboard(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<DashboardReport>> {
    ensure_admin(&headers, &app_state).await?;
    let report = app_state
        .invoice_store
        .dashboard_report(Utc::now().date_naive())
        .await?;
    Ok(Json(report))
}
