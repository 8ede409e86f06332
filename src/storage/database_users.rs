use async_trait::async_trait;
use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::error::AppError;
use crate::storage::database::Database;
use crate::storage::time::{parse_datetime_string, to_datetime_string};
use crate::users::{
    RegisterUserPayload, User, UserAuthRecord, UserRole, UserStore, hash_password,
};

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let role_s: String = row.get(3)?;
    let created_at_s: String = row.get(4)?;
    let updated_at_s: String = row.get(5)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
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
        updated_at: parse_datetime_string(&updated_at_s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?,
    })
}

fn row_to_auth(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserAuthRecord> {
    let role_s: String = row.get(2)?;
    Ok(UserAuthRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        role: UserRole::parse(&role_s).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(2, "role".into(), rusqlite::types::Type::Text)
        })?,
        password_hash: row.get(3)?,
    })
}

#[async_trait]
impl UserStore for Database {
    async fn create_user(&self, payload: RegisterUserPayload) -> Result<User, AppError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let email = payload.email.trim().to_lowercase();
        let password_hash = hash_password(&payload.password)?;

        let conn = self.connection.lock().await;
        // Email uniqueness checked before insert so the caller gets a
        // conflict instead of a raw constraint error.
        let exists: Option<String> = conn
            .query_row("SELECT id FROM users WHERE email = ?1", [&email], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_some() {
            return Err(AppError::Conflict("Email already registered".into()));
        }

        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                &id,
                &payload.name,
                &email,
                &password_hash,
                payload.role.as_str(),
                to_datetime_string(&now),
                to_datetime_string(&now),
            ],
        )?;

        Ok(User {
            id,
            name: payload.name,
            email,
            role: payload.role,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let conn = self.connection.lock().await;
        let user = conn
            .query_row(
                "SELECT id, name, email, role, created_at, updated_at
                 FROM users WHERE id = ?1",
                [id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    async fn get_auth_by_email(&self, email: &str) -> Result<Option<UserAuthRecord>, AppError> {
        let conn = self.connection.lock().await;
        let auth = conn
            .query_row(
                "SELECT id, email, role, password_hash FROM users WHERE email = ?1",
                [&email.trim().to_lowercase()],
                row_to_auth,
            )
            .optional()?;
        Ok(auth)
    }

    async fn get_auth_by_email_and_role(
        &self,
        email: &str,
        role: UserRole,
    ) -> Result<Option<UserAuthRecord>, AppError> {
        let conn = self.connection.lock().await;
        let auth = conn
            .query_row(
                "SELECT id, email, role, password_hash
                 FROM users WHERE email = ?1 AND role = ?2",
                rusqlite::params![&email.trim().to_lowercase(), role.as_str()],
                row_to_auth,
            )
            .optional()?;
        Ok(auth)
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool, AppError> {
        let now = Utc::now();
        let conn = self.connection.lock().await;
        let changed = conn.execute(
            "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
            rusqlite::params![id, password_hash, to_datetime_string(&now)],
        )?;
        Ok(changed > 0)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, name, email, role, created_at, updated_at
             FROM users ORDER BY created_at, id",
        )?;
        let user_iter = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for user in user_iter {
            users.push(user?);
        }
        Ok(users)
    }

    async fn delete_user(&self, id: &str) -> Result<bool, AppError> {
        let conn = self.connection.lock().await;
        let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }
}
