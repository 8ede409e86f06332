pub mod database;
pub mod database_invoices;
pub mod database_password_reset_tokens;
pub mod database_reminders;
pub mod database_sessions;
pub mod database_users;
pub mod time;

pub use database::Database;
