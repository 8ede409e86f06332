use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::config::ResetConfig;
use crate::error::AppError;
use crate::mail::Mailer;
use crate::password_reset_tokens::{
    PasswordResetTokenRecord, PasswordResetTokenStore, ResetApply, issue_reset_token,
};
use crate::users::{UserRole, UserStore, hash_password};

/// Response text shared by every forgot-password outcome. Whether the
/// account exists must not be observable from the response.
pub const GENERIC_RESET_MESSAGE: &str = "If the email exists, a reset link has been sent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCheck {
    pub valid: bool,
    pub message: &'static str,
}

/// Owns the reset-token lifecycle: issue, validate, consume. All state
/// lives in the token store; this type only sequences the steps and maps
/// terminal states to errors.
pub struct PasswordResetManager {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn PasswordResetTokenStore>,
    mailer: Arc<dyn Mailer>,
    settings: ResetConfig,
}

impl PasswordResetManager {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn PasswordResetTokenStore>,
        mailer: Arc<dyn Mailer>,
        settings: ResetConfig,
    ) -> Self {
        Self {
            users,
            tokens,
            mailer,
            settings,
        }
    }

    pub async fn request_reset(&self, email: &str, role: UserRole) -> Result<(), AppError> {
        self.request_reset_at(email, role, Utc::now()).await
    }

    async fn request_reset_at(
        &self,
        email: &str,
        role: UserRole,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let email = email.trim();
        if email.is_empty() {
            return Ok(());
        }
        let Some(user) = self.users.get_auth_by_email_and_role(email, role).await? else {
            // Same outcome as the success path: nothing to observe.
            return Ok(());
        };

        let token = issue_reset_token();
        let record = PasswordResetTokenRecord {
            id: Uuid::new_v4().to_string(),
            email: user.email.clone(),
            token: token.clone(),
            role,
            created_at: now,
            expires_at: now + Duration::minutes(self.settings.token_ttl_minutes),
        };
        self.tokens
            .create_reset_token(record, self.settings.invalidate_previous)
            .await?;
        tracing::info!(user_id = %user.id, "password reset token created");

        // Dispatched off the request path so response timing does not
        // depend on whether a mail is actually being sent.
        let mailer = self.mailer.clone();
        let to = user.email.clone();
        tokio::spawn(async move {
            mailer.send_reset_email(&to, &token).await;
        });
        Ok(())
    }

    /// Read-only, idempotent; safe as a UX pre-check before consuming.
    pub async fn check_token(&self, token: &str) -> Result<TokenCheck, AppError> {
        self.check_token_at(token, Utc::now()).await
    }

    async fn check_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenCheck, AppError> {
        let Some(record) = self.tokens.get_reset_token(token.trim()).await? else {
            return Ok(TokenCheck {
                valid: false,
                message: "Invalid token",
            });
        };
        if record.expires_at <= now {
            return Ok(TokenCheck {
                valid: false,
                message: "Token has expired",
            });
        }
        Ok(TokenCheck {
            valid: true,
            message: "Token is valid",
        })
    }

    pub async fn consume(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        self.consume_at(token, new_password, Utc::now()).await
    }

    async fn consume_at(
        &self,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::InvalidToken);
        }

        // Hash outside the store transaction; only the digest crosses it.
        let digest = hash_password(new_password)?;
        match self.tokens.apply_password_reset(token, &digest, now).await? {
            ResetApply::Applied { user_id } => {
                tracing::info!(user_id = %user_id, "password reset applied");
                Ok(())
            }
            ResetApply::NotFound => Err(AppError::InvalidToken),
            ResetApply::Expired => Err(AppError::Expired),
            ResetApply::UserMissing => Err(AppError::NotFound("User not found".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use crate::storage::Database;
    use crate::users::{RegisterUserPayload, verify_password};

    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingMailer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }

        async fn sent_count(&self) -> usize {
            self.sent.lock().await.len()
        }

        /// Sends happen on a spawned task; poll until the nth one lands.
        async fn wait_token(&self, index: usize) -> String {
            for _ in 0..100 {
                if let Some(entry) = self.sent.lock().await.get(index) {
                    return entry.1.clone();
                }
                tokio::task::yield_now().await;
            }
            panic!("reset email {} was never dispatched", index);
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_reset_email(&self, to: &str, token: &str) {
            self.sent
                .lock()
                .await
                .push((to.to_string(), token.to_string()));
        }
    }

    async fn setup(
        invalidate_previous: bool,
    ) -> (PasswordResetManager, Arc<Database>, Arc<RecordingMailer>) {
        let db = Arc::new(Database::new(":memory:").await.unwrap());
        let mailer = RecordingMailer::new();
        let settings = ResetConfig {
            token_ttl_minutes: 15,
            invalidate_previous,
        };
        let manager =
            PasswordResetManager::new(db.clone(), db.clone(), mailer.clone(), settings);
        (manager, db, mailer)
    }

    async fn register(db: &Database, email: &str, password: &str, role: UserRole) -> String {
        db.create_user(RegisterUserPayload {
            name: "Alice".into(),
            email: email.into(),
            password: password.into(),
            role,
        })
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn unknown_email_and_known_email_are_indistinguishable() {
        let (manager, db, mailer) = setup(false).await;
        register(&db, "alice@example.com", "OldPass123", UserRole::User).await;

        let known = manager
            .request_reset("alice@example.com", UserRole::User)
            .await;
        let unknown = manager
            .request_reset("nobody@example.com", UserRole::User)
            .await;
        assert!(known.is_ok());
        assert!(unknown.is_ok());
        // Only the side channel we control differs.
        mailer.wait_token(0).await;
        assert_eq!(mailer.sent_count().await, 1);
    }

    #[tokio::test]
    async fn request_is_role_scoped() {
        let (manager, db, mailer) = setup(false).await;
        register(&db, "alice@example.com", "OldPass123", UserRole::User).await;

        manager
            .request_reset("alice@example.com", UserRole::Admin)
            .await
            .unwrap();
        assert_eq!(mailer.sent_count().await, 0);
    }

    #[tokio::test]
    async fn check_is_valid_strictly_before_expiry() {
        let (manager, db, mailer) = setup(false).await;
        register(&db, "alice@example.com", "OldPass123", UserRole::User).await;
        let issued_at = Utc::now();
        manager
            .request_reset_at("alice@example.com", UserRole::User, issued_at)
            .await
            .unwrap();
        let token = mailer.wait_token(0).await;

        let before = manager
            .check_token_at(&token, issued_at + Duration::minutes(14))
            .await
            .unwrap();
        assert!(before.valid);

        let at_expiry = manager
            .check_token_at(&token, issued_at + Duration::minutes(15))
            .await
            .unwrap();
        assert!(!at_expiry.valid);
        assert_eq!(at_expiry.message, "Token has expired");

        // The check is read-only: the record survives and repeats itself.
        let again = manager
            .check_token_at(&token, issued_at + Duration::minutes(15))
            .await
            .unwrap();
        assert_eq!(again.message, "Token has expired");
    }

    #[tokio::test]
    async fn check_reports_invalid_for_unknown_token() {
        let (manager, _db, _mailer) = setup(false).await;
        let check = manager.check_token("no-such-token").await.unwrap();
        assert!(!check.valid);
        assert_eq!(check.message, "Invalid token");
    }

    #[tokio::test]
    async fn consume_rotates_the_password_and_burns_the_token() {
        let (manager, db, mailer) = setup(false).await;
        register(&db, "alice@example.com", "OldPass123", UserRole::User).await;
        manager
            .request_reset("alice@example.com", UserRole::User)
            .await
            .unwrap();
        let token = mailer.wait_token(0).await;

        manager.consume(&token, "Str0ngPass!").await.unwrap();

        let auth = db
            .get_auth_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(verify_password("Str0ngPass!", &auth.password_hash));
        assert!(!verify_password("OldPass123", &auth.password_hash));

        // Single use: the second attempt no longer finds the token.
        let err = manager.consume(&token, "Y3tAnother!").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
        let check = manager.check_token(&token).await.unwrap();
        assert_eq!(check.message, "Invalid token");
    }

    #[tokio::test]
    async fn expired_consume_fails_and_deletes_the_record() {
        let (manager, db, mailer) = setup(false).await;
        register(&db, "alice@example.com", "OldPass123", UserRole::User).await;
        let issued_at = Utc::now();
        manager
            .request_reset_at("alice@example.com", UserRole::User, issued_at)
            .await
            .unwrap();
        let token = mailer.wait_token(0).await;

        let err = manager
            .consume_at(&token, "Str0ngPass!", issued_at + Duration::minutes(16))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Expired));

        // Expiry detection during consumption burns the token too.
        let check = manager.check_token(&token).await.unwrap();
        assert_eq!(check.message, "Invalid token");

        let auth = db
            .get_auth_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(verify_password("OldPass123", &auth.password_hash));
    }

    #[tokio::test]
    async fn consume_for_a_deleted_user_fails_and_burns_the_token() {
        let (manager, db, mailer) = setup(false).await;
        let user_id = register(&db, "alice@example.com", "OldPass123", UserRole::User).await;
        manager
            .request_reset("alice@example.com", UserRole::User)
            .await
            .unwrap();
        let token = mailer.wait_token(0).await;

        assert!(db.delete_user(&user_id).await.unwrap());

        let err = manager.consume(&token, "Str0ngPass!").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let check = manager.check_token(&token).await.unwrap();
        assert_eq!(check.message, "Invalid token");
    }

    #[tokio::test]
    async fn multiple_outstanding_tokens_by_default() {
        let (manager, db, mailer) = setup(false).await;
        register(&db, "alice@example.com", "OldPass123", UserRole::User).await;

        manager
            .request_reset("alice@example.com", UserRole::User)
            .await
            .unwrap();
        let first = mailer.wait_token(0).await;
        manager
            .request_reset("alice@example.com", UserRole::User)
            .await
            .unwrap();
        let second = mailer.wait_token(1).await;
        assert_ne!(first, second);

        assert!(manager.check_token(&first).await.unwrap().valid);
        assert!(manager.check_token(&second).await.unwrap().valid);

        // The older token still works for the actual reset.
        manager.consume(&first, "Str0ngPass!").await.unwrap();
    }

    #[tokio::test]
    async fn invalidate_previous_leaves_only_the_newest_token() {
        let (manager, db, mailer) = setup(true).await;
        register(&db, "alice@example.com", "OldPass123", UserRole::User).await;

        manager
            .request_reset("alice@example.com", UserRole::User)
            .await
            .unwrap();
        let first = mailer.wait_token(0).await;
        manager
            .request_reset("alice@example.com", UserRole::User)
            .await
            .unwrap();
        let second = mailer.wait_token(1).await;

        assert!(!manager.check_token(&first).await.unwrap().valid);
        assert!(manager.check_token(&second).await.unwrap().valid);
    }

    #[tokio::test]
    async fn concurrent_consume_has_exactly_one_winner() {
        let (manager, db, mailer) = setup(false).await;
        register(&db, "alice@example.com", "OldPass123", UserRole::User).await;
        manager
            .request_reset("alice@example.com", UserRole::User)
            .await
            .unwrap();
        let token = mailer.wait_token(0).await;

        let (a, b) = tokio::join!(
            manager.consume(&token, "WinnerPass1!"),
            manager.consume(&token, "WinnerPass2!"),
        );

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        for result in [a, b] {
            if let Err(e) = result {
                assert!(matches!(e, AppError::InvalidToken | AppError::Expired));
            }
        }

        // Whichever password won, the old one is gone.
        let auth = db
            .get_auth_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(!verify_password("OldPass123", &auth.password_hash));
        assert!(
            verify_password("WinnerPass1!", &auth.password_hash)
                || verify_password("WinnerPass2!", &auth.password_hash)
        );
    }
}
