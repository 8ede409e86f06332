use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;

pub const SESSION_TTL_HOURS: i64 = 8;
const SESSION_TOKEN_LEN: usize = 56;

/// Bearer session issued at login. Only the sha256 of the token is stored,
/// so a leaked database cannot be replayed against the API.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub token_hash: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, record: &SessionRecord) -> Result<(), AppError>;
    async fn get_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, AppError>;
    async fn revoke_session(&self, token_hash: &str) -> Result<bool, AppError>;
}

pub fn issue_session_token() -> String {
    use rand::Rng;
    use rand::distr::Alphanumeric;

    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub fn hash_session_token(token: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
