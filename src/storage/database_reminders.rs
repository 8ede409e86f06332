use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::reminders::{CreateReminderPayload, Reminder, ReminderStore};
use crate::storage::database::Database;
use crate::storage::time::{parse_datetime_string, to_datetime_string};

fn row_to_reminder(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reminder> {
    let sent_at_s: String = row.get(4)?;
    Ok(Reminder {
        id: row.get(0)?,
        user_id: row.get(1)?,
        invoice_id: row.get(2)?,
        message: row.get(3)?,
        sent_at: parse_datetime_string(&sent_at_s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?,
    })
}

#[async_trait]
impl ReminderStore for Database {
    async fn create_reminder(
        &self,
        user_id: &str,
        payload: CreateReminderPayload,
    ) -> Result<Reminder, AppError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let conn = self.connection.lock().await;
        conn.execute(
            "INSERT INTO reminders (id, user_id, invoice_id, message, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                &id,
                user_id,
                &payload.invoice_id,
                &payload.message,
                to_datetime_string(&now),
            ],
        )?;

        Ok(Reminder {
            id,
            user_id: user_id.to_string(),
            invoice_id: payload.invoice_id,
            message: payload.message,
            sent_at: now,
        })
    }

    async fn list_reminders_for_user(&self, user_id: &str) -> Result<Vec<Reminder>, AppError> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, invoice_id, message, sent_at
             FROM reminders WHERE user_id = ?1 ORDER BY sent_at DESC, id",
        )?;
        let reminder_iter = stmt.query_map([user_id], row_to_reminder)?;

        let mut reminders = Vec::new();
        for reminder in reminder_iter {
            reminders.push(reminder?);
        }
        Ok(reminders)
    }

    async fn list_reminders(&self) -> Result<Vec<Reminder>, AppError> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, invoice_id, message, sent_at
             FROM reminders ORDER BY sent_at DESC, id",
        )?;
        let reminder_iter = stmt.query_map([], row_to_reminder)?;

        let mut reminders = Vec::new();
        for reminder in reminder_iter {
            reminders.push(reminder?);
        }
        Ok(reminders)
    }
}
