pub(crate) mod auth;
pub mod handlers;
pub mod password_reset;

use std::sync::Arc;

use axum::Router;

use crate::config::Settings;
use crate::error::Result as AppResult;
use crate::invoices::InvoiceStore;
use crate::mail::{LogMailer, Mailer, ResendMailer};
use crate::reminders::ReminderStore;
use crate::server::password_reset::PasswordResetManager;
use crate::sessions::SessionStore;
use crate::storage::Database;
use crate::users::UserStore;

#[derive(Clone)]
pub struct AppState {
    pub user_store: Arc<dyn UserStore>,
    pub invoice_store: Arc<dyn InvoiceStore>,
    pub reminder_store: Arc<dyn ReminderStore>,
    pub session_store: Arc<dyn SessionStore>,
    pub reset_manager: Arc<PasswordResetManager>,
}

pub async fn create_app(config: Settings) -> AppResult<Router> {
    let db = Arc::new(Database::new(&config.database.path).await?);

    let mailer: Arc<dyn Mailer> = match ResendMailer::from_env(&config.mail) {
        Some(m) => {
            tracing::info!("Using Resend for password reset emails");
            Arc::new(m)
        }
        None => {
            tracing::warn!(
                "RESEND_API_KEY/RESEND_FROM not configured; reset links will only be logged"
            );
            Arc::new(LogMailer::new(&config.mail))
        }
    };

    let reset_manager = Arc::new(PasswordResetManager::new(
        db.clone(),
        db.clone(),
        mailer,
        config.reset.clone(),
    ));

    let app_state = AppState {
        user_store: db.clone(),
        invoice_store: db.clone(),
        reminder_store: db.clone(),
        session_store: db,
        reset_manager,
    };

    let mut app = handlers::routes().with_state(Arc::new(app_state));

    // CORS（开发环境便于前端联调；生产应收敛来源并仅 HTTPS）
    use axum::http::{Method, header};
    use tower_http::cors::{AllowOrigin, CorsLayer};
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true);
    app = app.layer(cors);

    Ok(app)
}
