use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

use crate::error::AppError;
use crate::password_reset_tokens::{
    PasswordResetTokenRecord, PasswordResetTokenStore, ResetApply,
};
use crate::storage::database::Database;
use crate::storage::time::{parse_datetime_string, to_datetime_string};
use crate::users::UserRole;

fn row_to_reset_token(row: &rusqlite::Row<'_>) -> rusqlite::Result<PasswordResetTokenRecord> {
    let role_s: String = row.get(3)?;
    let created_at_s: String = row.get(4)?;
    let expires_at_s: String = row.get(5)?;
    Ok(PasswordResetTokenRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        token: row.get(2)?,
        role: UserRole::parse(&role_s).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(3, "role".into(), rusqlite::types::Type::Text)
        })?,
        created_at: parse_datetime_string(&created_at_s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?,
        expires_at: parse_datetime_string(&expires_at_s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?,
    })
}

#[async_trait]
impl PasswordResetTokenStore for Database {
    async fn create_reset_token(
        &self,
        record: PasswordResetTokenRecord,
        invalidate_previous: bool,
    ) -> Result<(), AppError> {
        let mut conn = self.connection.lock().await;
        let tx = conn.transaction()?;

        if invalidate_previous {
            tx.execute(
                "DELETE FROM password_reset_tokens WHERE email = ?1 AND role = ?2",
                rusqlite::params![&record.email, record.role.as_str()],
            )?;
        }

        tx.execute(
            "INSERT INTO password_reset_tokens (id, email, token, role, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                &record.id,
                &record.email,
                &record.token,
                record.role.as_str(),
                to_datetime_string(&record.created_at),
                to_datetime_string(&record.expires_at),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    async fn get_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetTokenRecord>, AppError> {
        let conn = self.connection.lock().await;
        let record = conn
            .query_row(
                "SELECT id, email, token, role, created_at, expires_at
                 FROM password_reset_tokens WHERE token = ?1",
                [token],
                row_to_reset_token,
            )
            .optional()?;
        Ok(record)
    }

    async fn apply_password_reset(
        &self,
        token: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<ResetApply, AppError> {
        let mut conn = self.connection.lock().await;
        let tx = conn.transaction()?;

        let record = tx
            .query_row(
                "SELECT id, email, token, role, created_at, expires_at
                 FROM password_reset_tokens WHERE token = ?1",
                [token],
                row_to_reset_token,
            )
            .optional()?;
        let Some(record) = record else {
            // Nothing written; the implicit rollback is a no-op.
            return Ok(ResetApply::NotFound);
        };

        // Valid strictly before expires_at.
        if record.expires_at <= now {
            tx.execute(
                "DELETE FROM password_reset_tokens WHERE token = ?1",
                [token],
            )?;
            tx.commit()?;
            return Ok(ResetApply::Expired);
        }

        let user_id: Option<String> = tx
            .query_row(
                "SELECT id FROM users WHERE email = ?1 AND role = ?2",
                rusqlite::params![&record.email, record.role.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(user_id) = user_id else {
            tx.execute(
                "DELETE FROM password_reset_tokens WHERE token = ?1",
                [token],
            )?;
            tx.commit()?;
            return Ok(ResetApply::UserMissing);
        };

        tx.execute(
            "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
            rusqlite::params![&user_id, password_hash, to_datetime_string(&now)],
        )?;

        // Conditional delete: if another consumer got here first the row is
        // gone, and this attempt must lose without committing the update.
        let deleted = tx.execute(
            "DELETE FROM password_reset_tokens WHERE token = ?1",
            [token],
        )?;
        if deleted == 0 {
            return Ok(ResetApply::NotFound);
        }

        tx.commit()?;
        Ok(ResetApply::Applied { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    use crate::password_reset_tokens::issue_reset_token;
    use crate::users::{RegisterUserPayload, UserStore, hash_password, verify_password};

    fn record(email: &str, token: &str, now: DateTime<Utc>) -> PasswordResetTokenRecord {
        PasswordResetTokenRecord {
            id: Uuid::new_v4().to_string(),
            email: email.into(),
            token: token.into(),
            role: UserRole::User,
            created_at: now,
            expires_at: now + Duration::minutes(15),
        }
    }

    #[tokio::test]
    async fn apply_updates_user_and_deletes_token() {
        let db = Database::new(":memory:").await.unwrap();
        db.create_user(RegisterUserPayload {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password: "OldPass123".into(),
            role: UserRole::User,
        })
        .await
        .unwrap();

        let now = Utc::now();
        let token = issue_reset_token();
        db.create_reset_token(record("alice@example.com", &token, now), false)
            .await
            .unwrap();

        let digest = hash_password("Str0ngPass!").unwrap();
        let applied = db.apply_password_reset(&token, &digest, now).await.unwrap();
        assert!(matches!(applied, ResetApply::Applied { .. }));

        let auth = db
            .get_auth_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(verify_password("Str0ngPass!", &auth.password_hash));
        assert!(db.get_reset_token(&token).await.unwrap().is_none());

        // Replay loses.
        let replay = db.apply_password_reset(&token, &digest, now).await.unwrap();
        assert_eq!(replay, ResetApply::NotFound);
    }

    #[tokio::test]
    async fn expired_apply_deletes_the_record() {
        let db = Database::new(":memory:").await.unwrap();
        let now = Utc::now();
        let token = issue_reset_token();
        db.create_reset_token(record("ghost@example.com", &token, now), false)
            .await
            .unwrap();

        let digest = hash_password("Str0ngPass!").unwrap();
        let late = now + Duration::minutes(16);
        let outcome = db
            .apply_password_reset(&token, &digest, late)
            .await
            .unwrap();
        assert_eq!(outcome, ResetApply::Expired);
        assert!(db.get_reset_token(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_user_deletes_the_record() {
        let db = Database::new(":memory:").await.unwrap();
        let now = Utc::now();
        let token = issue_reset_token();
        db.create_reset_token(record("ghost@example.com", &token, now), false)
            .await
            .unwrap();

        let digest = hash_password("Str0ngPass!").unwrap();
        let outcome = db.apply_password_reset(&token, &digest, now).await.unwrap();
        assert_eq!(outcome, ResetApply::UserMissing);
        assert!(db.get_reset_token(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_previous_drops_older_tokens() {
        let db = Database::new(":memory:").await.unwrap();
        let now = Utc::now();
        let first = issue_reset_token();
        let second = issue_reset_token();

        db.create_reset_token(record("alice@example.com", &first, now), false)
            .await
            .unwrap();
        db.create_reset_token(record("alice@example.com", &second, now), true)
            .await
            .unwrap();

        assert!(db.get_reset_token(&first).await.unwrap().is_none());
        assert!(db.get_reset_token(&second).await.unwrap().is_some());
    }
}
