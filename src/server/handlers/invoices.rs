use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::error::Result as AppResult;
use crate::invoices::{CreateInvoicePayload, Invoice};
use crate::server::AppState;
use crate::server::auth::ensure_user;

pub async fn create_invoice(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateInvoicePayload>,
) -> AppResult<(StatusCode, Json<Invoice>)> {
    let user = ensure_user(&headers, &app_state).await?;
    let invoice = app_state
        .invoice_store
        .create_invoice(&user.id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn list_invoices(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<Invoice>>> {
    let user = ensure_user(&headers, &app_state).await?;
    let invoices = app_state
        .invoice_store
        .list_invoices_for_user(&user.id)
        .await?;
    Ok(Json(invoices))
}
