mod config;
mod error;
mod invoices;
mod mail;
mod password_reset_tokens;
mod reminders;
mod server;
mod sessions;
mod storage;
mod users;

use tracing_subscriber::fmt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    fmt::init();

    let config = config::Settings::load()?;

    // Use configured host/port to bind the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = server::create_app(config).await?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Payment reminder backend running on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
