use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Otp, ResetToken};
use crate::error::Result;

#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Revokes every currently valid OTP of the user and inserts `otp`, as
    /// one unit of work.
    async fn issue_otp(&self, otp: &Otp, now: DateTime<Utc>) -> Result<()>;
    /// Most recently issued OTP of the user, whatever its state.
    async fn find_latest_otp(&self, user_id: &str) -> Result<Option<Otp>>;
    /// Counts one wrong code against an open OTP and revokes it once the
    /// count reaches `max_attempts`. Returns the new count, or `None` when
    /// the OTP was already verified or revoked.
    async fn record_failed_otp_attempt(&self, id: &str, max_attempts: i32, now: DateTime<Utc>) -> Result<Option<i32>>;
    /// Marks an open, unexpired OTP verified. `false` when it was closed first.
    async fn mark_otp_verified(&self, id: &str, now: DateTime<Utc>) -> Result<bool>;
}

#[async_trait]
pub trait ResetTokenRepository: Send + Sync {
    async fn insert_reset_token(&self, token: &ResetToken) -> Result<()>;
    async fn list_live_reset_tokens(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<ResetToken>>;
    /// Stores the new password hash, deletes every reset token of the user
    /// and revokes all their sessions, as one unit of work.
    async fn complete_password_reset(&self, user_id: &str, password_hash: &str) -> Result<()>;
}
