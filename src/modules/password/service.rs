use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use super::model::{
    Otp, OtpState, ResetToken, OTP_LENGTH, OTP_MAX_ATTEMPTS, OTP_TTL_MINUTES,
    RESET_TOKEN_TTL_MINUTES,
};
use crate::error::{AppError, Result};
use crate::modules::auth::service::normalize_email;
use crate::services::hashing;
use crate::services::mailer::Mailer;
use crate::store::Store;

fn generate_otp() -> String {
    let code: u32 = rand::rng().random_range(0..1_000_000);
    format!("{:0width$}", code, width = OTP_LENGTH)
}

fn generate_reset_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

pub fn is_well_formed_otp(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

pub struct PasswordService<'a> {
    store: &'a dyn Store,
    mailer: &'a dyn Mailer,
}

impl<'a> PasswordService<'a> {
    pub fn new(store: &'a dyn Store, mailer: &'a dyn Mailer) -> Self {
        Self { store, mailer }
    }

    /// Issues a new OTP when `email` belongs to a live user. Callers answer
    /// the same way whether or not it does.
    pub async fn request_reset(&self, email: &str) -> Result<()> {
        let Some(user) = self.store.find_user_by_email(&normalize_email(email)).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let now = Utc::now();
        let code = generate_otp();
        let otp = Otp {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            code_hash: hashing::hash_secret(&code)?,
            attempts: 0,
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
            verified_at: None,
            revoked_at: None,
            created_at: now,
        };
        self.store.issue_otp(&otp, now).await?;

        if let Err(e) = self.mailer.send_otp(&user.email, &user.name, &code).await {
            tracing::error!(user_id = %user.id, error = %e, "failed to deliver OTP");
        }
        Ok(())
    }

    /// Checks `code` against the user's current OTP and returns a single-use
    /// reset token on success.
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<String> {
        if !is_well_formed_otp(code) {
            return Err(AppError::Validation(format!("OTP must be {OTP_LENGTH} digits")));
        }

        let user = self
            .store
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::OtpNotFound)?;
        let otp = self
            .store
            .find_latest_otp(&user.id)
            .await?
            .ok_or(AppError::OtpNotFound)?;

        let now = Utc::now();
        match otp.state(now) {
            OtpState::Valid => {}
            OtpState::Exhausted => return Err(AppError::MaxAttemptsExceeded),
            OtpState::Verified | OtpState::Expired | OtpState::Revoked => {
                return Err(AppError::OtpNotFound)
            }
        }

        if !hashing::verify_secret(code, &otp.code_hash)? {
            let recorded = self
                .store
                .record_failed_otp_attempt(&otp.id, OTP_MAX_ATTEMPTS, now)
                .await?;
            tracing::warn!(user_id = %user.id, attempts = ?recorded, "incorrect OTP submitted");

            return Err(match recorded {
                Some(attempts) if attempts < OTP_MAX_ATTEMPTS => AppError::InvalidOtp {
                    remaining: OTP_MAX_ATTEMPTS - attempts,
                },
                Some(_) => AppError::MaxAttemptsExceeded,
                None => self.closed_otp_error(&user.id, now).await?,
            });
        }

        if !self.store.mark_otp_verified(&otp.id, now).await? {
            return Err(self.closed_otp_error(&user.id, now).await?);
        }

        let raw_token = generate_reset_token();
        self.store
            .insert_reset_token(&ResetToken {
                id: Uuid::new_v4().to_string(),
                user_id: user.id.clone(),
                token_hash: hashing::hash_secret(&raw_token)?,
                expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
                verified: true,
                created_at: now,
            })
            .await?;

        tracing::info!(user_id = %user.id, "OTP verified, reset token issued");
        Ok(raw_token)
    }

    /// Error for an OTP that another request closed after it was read.
    async fn closed_otp_error(&self, user_id: &str, now: DateTime<Utc>) -> Result<AppError> {
        let state = self.store.find_latest_otp(user_id).await?.map(|o| o.state(now));
        Ok(match state {
            Some(OtpState::Exhausted) => AppError::MaxAttemptsExceeded,
            _ => AppError::OtpNotFound,
        })
    }

    /// Sets a new password, consumes every reset token and ends all sessions.
    pub async fn reset_password(&self, email: &str, reset_token: &str, new_password: &str) -> Result<()> {
        let user = self
            .store
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::InvalidResetToken)?;

        let mut matched = false;
        for token in self.store.list_live_reset_tokens(&user.id, Utc::now()).await? {
            if token.verified && hashing::verify_secret(reset_token, &token.token_hash)? {
                matched = true;
                break;
            }
        }
        if !matched {
            tracing::warn!(user_id = %user.id, "reset token rejected");
            return Err(AppError::InvalidResetToken);
        }

        let password_hash = hashing::hash_password(new_password)?;
        self.store.complete_password_reset(&user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "password reset completed");
        Ok(())
    }
}
