use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::error::{AppError, Result as AppResult};
use crate::reminders::{CreateReminderPayload, Reminder};
use crate::server::AppState;
use crate::server::auth::ensure_user;

pub async fn create_reminder(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateReminderPayload>,
) -> AppResult<(StatusCode, Json<Reminder>)> {
    let user = ensure_user(&headers, &app_state).await?;

    // Reminders can only be attached to the caller's own invoices; a
    // foreign invoice id is indistinguishable from a missing one.
    let invoice = app_state.invoice_store.get_invoice(&payload.invoice_id).await?;
    match invoice {
        Some(inv) if inv.user_id == user.id => {}
        _ => return Err(AppError::NotFound("Invoice not found".into())),
    }

    let reminder = app_state
        .reminder_store
        .create_reminder(&user.id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(reminder)))
}

pub async fn list_reminders(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<Reminder>>> {
    let user = ensure_user(&headers, &app_state).await?;
    let reminders = app_state
        .reminder_store
        .list_reminders_for_user(&user.id)
        .await?;
    Ok(Json(reminders))
}
