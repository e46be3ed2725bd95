use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Digits in an OTP code.
pub const OTP_LENGTH: usize = 6;
/// Wrong submissions allowed before the OTP is revoked.
pub const OTP_MAX_ATTEMPTS: i32 = 3;
pub const OTP_TTL_MINUTES: i64 = 5;
pub const RESET_TOKEN_TTL_MINUTES: i64 = 5;

#[derive(Debug, Clone, FromRow)]
pub struct Otp {
    pub id: String,
    pub user_id: String,
    pub code_hash: String,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Where an OTP stands when a code is submitted. Expiry is evaluated at
/// read time, there is no background sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpState {
    Valid,
    Verified,
    Expired,
    Revoked,
    Exhausted,
}

impl Otp {
    pub fn state(&self, now: DateTime<Utc>) -> OtpState {
        if self.verified_at.is_some() {
            OtpState::Verified
        } else if self.revoked_at.is_some() {
            if self.attempts >= OTP_MAX_ATTEMPTS {
                OtpState::Exhausted
            } else {
                OtpState::Revoked
            }
        } else if self.expires_at <= now {
            OtpState::Expired
        } else {
            OtpState::Valid
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == OtpState::Valid
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ResetToken {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}
