use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::interface::{OtpRepository, ResetTokenRepository};
use super::model::{Otp, ResetToken};
use crate::error::Result;
use crate::store::mysql::MySqlStore;

#[async_trait]
impl OtpRepository for MySqlStore {
    async fn issue_otp(&self, otp: &Otp, now: DateTime<Utc>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE otps SET revoked_at = ?
            WHERE user_id = ? AND verified_at IS NULL AND revoked_at IS NULL AND expires_at > ?
            "#,
        )
        .bind(now)
        .bind(&otp.user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO otps (id, user_id, code_hash, attempts, expires_at, verified_at, revoked_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&otp.id)
        .bind(&otp.user_id)
        .bind(&otp.code_hash)
        .bind(otp.attempts)
        .bind(otp.expires_at)
        .bind(otp.verified_at)
        .bind(otp.revoked_at)
        .bind(otp.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_latest_otp(&self, user_id: &str) -> Result<Option<Otp>> {
        Ok(sqlx::query_as::<_, Otp>(
            r#"
            SELECT id, user_id, code_hash, attempts, expires_at, verified_at, revoked_at, created_at
            FROM otps
            WHERE user_id = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn record_failed_otp_attempt(&self, id: &str, max_attempts: i32, now: DateTime<Utc>) -> Result<Option<i32>> {
        let mut tx = self.pool.begin().await?;

        let attempts: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT attempts FROM otps
            WHERE id = ? AND verified_at IS NULL AND revoked_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(attempts) = attempts.map(|a| a + 1) else {
            tx.commit().await?;
            return Ok(None);
        };
        let revoked_at = (attempts >= max_attempts).then_some(now);

        sqlx::query("UPDATE otps SET attempts = ?, revoked_at = ? WHERE id = ?")
            .bind(attempts)
            .bind(revoked_at)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(attempts))
    }

    async fn mark_otp_verified(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE otps SET verified_at = ?
            WHERE id = ? AND verified_at IS NULL AND revoked_at IS NULL AND expires_at > ?
            "#,
        )
        .bind(now)
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl ResetTokenRepository for MySqlStore {
    async fn insert_reset_token(&self, token: &ResetToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reset_tokens (id, user_id, token_hash, expires_at, verified, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&token.id)
        .bind(&token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.verified)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_live_reset_tokens(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<ResetToken>> {
        Ok(sqlx::query_as::<_, ResetToken>(
            r#"
            SELECT id, user_id, token_hash, expires_at, verified, created_at
            FROM reset_tokens
            WHERE user_id = ? AND expires_at > ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn complete_password_reset(&self, user_id: &str, password_hash: &str) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM reset_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE, updated_at = ? WHERE user_id = ? AND revoked = FALSE")
            .bind(now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
