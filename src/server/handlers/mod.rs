use axum::{
    Json,
    Router,
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::server::AppState;

mod admin;
mod auth_password_reset;
mod invoices;
mod reminders;
mod users;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health))
        // Accounts and sessions
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/logout", post(users::logout))
        .route("/users/me", get(users::me))
        // Password reset flow
        .route(
            "/auth/{role}/forgot-password",
            post(auth_password_reset::forgot_password),
        )
        .route(
            "/auth/validate-reset-token",
            post(auth_password_reset::validate_reset_token),
        )
        .route(
            "/auth/reset-password",
            post(auth_password_reset::reset_password),
        )
        // Invoices and reminders, scoped to the session user
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/reminders",
            get(reminders::list_reminders).post(reminders::create_reminder),
        )
        // Admin surface
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}", delete(admin::delete_user))
        .route(
            "/admin/users/{id}/reset-password",
            post(admin::reset_user_password),
        )
        .route("/admin/invoices", get(admin::list_invoices))
        .route("/admin/reminders", get(admin::list_reminders))
        .route("/admin/dashboard", get(admin::dashboard))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
