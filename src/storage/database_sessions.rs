use async_trait::async_trait;
use rusqlite::OptionalExtension;

use crate::error::AppError;
use crate::sessions::{SessionRecord, SessionStore};
use crate::storage::database::Database;
use crate::storage::time::{parse_datetime_string, to_datetime_string};

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    let created_at_s: String = row.get(2)?;
    let expires_at_s: String = row.get(3)?;
    Ok(SessionRecord {
        token_hash: row.get(0)?,
        user_id: row.get(1)?,
        created_at: parse_datetime_string(&created_at_s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?,
        expires_at: parse_datetime_string(&expires_at_s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?,
        revoked: row.get::<_, i64>(4)? != 0,
    })
}

#[async_trait]
impl SessionStore for Database {
    async fn insert_session(&self, record: &SessionRecord) -> Result<(), AppError> {
        let conn = self.connection.lock().await;
        conn.execute(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at, revoked)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                &record.token_hash,
                &record.user_id,
                to_datetime_string(&record.created_at),
                to_datetime_string(&record.expires_at),
                record.revoked as i64,
            ],
        )?;
        Ok(())
    }

    async fn get_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, AppError> {
        let conn = self.connection.lock().await;
        let session = conn
            .query_row(
                "SELECT token_hash, user_id, created_at, expires_at, revoked
                 FROM sessions WHERE token_hash = ?1",
                [token_hash],
                row_to_session,
            )
            .optional()?;
        Ok(session)
    }

    async fn revoke_session(&self, token_hash: &str) -> Result<bool, AppError> {
        let conn = self.connection.lock().await;
        let changed = conn.execute(
            "UPDATE sessions SET revoked = 1 WHERE token_hash = ?1 AND revoked = 0",
            [token_hash],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::sessions::{SESSION_TTL_HOURS, hash_session_token, issue_session_token};

    #[tokio::test]
    async fn session_lifecycle() {
        let db = Database::new(":memory:").await.unwrap();
        let token = issue_session_token();
        let now = Utc::now();
        let record = SessionRecord {
            token_hash: hash_session_token(&token),
            user_id: "user-1".into(),
            created_at: now,
            expires_at: now + Duration::hours(SESSION_TTL_HOURS),
            revoked: false,
        };
        db.insert_session(&record).await.unwrap();

        let fetched = db
            .get_session(&hash_session_token(&token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.user_id, "user-1");
        assert!(!fetched.revoked);

        assert!(db.revoke_session(&record.token_hash).await.unwrap());
        // Second revoke is a no-op.
        assert!(!db.revoke_session(&record.token_hash).await.unwrap());
        let fetched = db.get_session(&record.token_hash).await.unwrap().unwrap();
        assert!(fetched.revoked);
    }
}
