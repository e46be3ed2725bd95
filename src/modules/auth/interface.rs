use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{BlacklistedToken, RefreshToken, Role, User};
use crate::error::Result;

// =============================================================================
// REPOSITORY TRAITS
// =============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `EmailTaken` when the email is already registered, soft
    /// deleted accounts included.
    async fn create_user(&self, user: &User) -> Result<()>;
    /// Live (not soft-deleted) user by id.
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>>;
    /// Live (not soft-deleted) user by email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>>;
    async fn update_user_role(&self, user_id: &str, role: Role) -> Result<bool>;
    /// Marks the user deleted. Sessions are revoked separately through
    /// `RefreshTokenRepository::revoke_all_refresh_tokens`.
    async fn soft_delete_user(&self, user_id: &str) -> Result<bool>;
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// All slots of a user, revoked ones included, oldest expiry first.
    async fn list_refresh_tokens(&self, user_id: &str) -> Result<Vec<RefreshToken>>;
    /// Non-revoked, unexpired slots of a user.
    async fn list_live_refresh_tokens(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<RefreshToken>>;
    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<()>;
    /// Reuses an existing slot for a new token and clears its revoked flag.
    async fn overwrite_refresh_token(
        &self,
        id: &str,
        token_hash: &str,
        device: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;
    /// Swaps a live slot from `expected_hash` to `new_hash`. Returns `false`
    /// when the slot no longer holds `expected_hash`, so a refresh token can
    /// only ever be rotated once.
    async fn rotate_refresh_token(
        &self,
        id: &str,
        expected_hash: &str,
        new_hash: &str,
        device: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool>;
    async fn revoke_refresh_token(&self, id: &str) -> Result<()>;
    async fn revoke_all_refresh_tokens(&self, user_id: &str) -> Result<u64>;
}

#[async_trait]
pub trait BlacklistRepository: Send + Sync {
    async fn insert_blacklisted_token(&self, entry: &BlacklistedToken) -> Result<()>;
    async fn is_token_blacklisted(&self, user_id: &str, token: &str) -> Result<bool>;
}
