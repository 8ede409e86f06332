use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub user_id: String,
    pub invoice_id: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReminderPayload {
    pub invoice_id: String,
    pub message: String,
}

#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn create_reminder(
        &self,
        user_id: &str,
        payload: CreateReminderPayload,
    ) -> Result<Reminder, AppError>;
    /// Newest first.
    async fn list_reminders_for_user(&self, user_id: &str) -> Result<Vec<Reminder>, AppError>;
    async fn list_reminders(&self) -> Result<Vec<Reminder>, AppError>;
}
