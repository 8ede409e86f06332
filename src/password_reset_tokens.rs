use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::users::UserRole;

#[derive(Debug, Clone)]
pub struct PasswordResetTokenRecord {
    pub id: String,
    pub email: String,
    pub token: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of the transactional consume step. Every variant except
/// `Applied` is a terminal failure of the token state machine; the row is
/// also deleted on `Expired` and `UserMissing`, so the token can never be
/// replayed once it has been looked at by the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetApply {
    NotFound,
    Expired,
    UserMissing,
    Applied { user_id: String },
}

#[async_trait]
pub trait PasswordResetTokenStore: Send + Sync {
    /// Persists a fresh token. With `invalidate_previous`, earlier tokens
    /// for the same `(email, role)` are deleted in the same transaction.
    async fn create_reset_token(
        &self,
        record: PasswordResetTokenRecord,
        invalidate_previous: bool,
    ) -> Result<(), AppError>;

    /// Read-only lookup used by the validator endpoint.
    async fn get_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetTokenRecord>, AppError>;

    /// Validates and consumes `token`, applying `password_hash` to the
    /// matching user. Password update and token deletion commit together
    /// or not at all. Under concurrent calls the conditional delete makes
    /// the loser observe `NotFound`.
    async fn apply_password_reset(
        &self,
        token: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<ResetApply, AppError>;
}

/// 32 bytes of CSPRNG entropy, URL-safe so the token can ride in a link.
pub fn issue_reset_token() -> String {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64_URL_SAFE_NO_PAD;
    use rand::Rng;

    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    B64_URL_SAFE_NO_PAD.encode(bytes)
}
