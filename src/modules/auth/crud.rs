use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::interface::{BlacklistRepository, RefreshTokenRepository, UserRepository};
use super::model::{BlacklistedToken, RefreshToken, Role, User};
use crate::error::{AppError, Result};
use crate::store::mysql::{is_unique_violation, MySqlStore};

const USER_COLUMNS: &str =
    "id, role, name, email, password_hash, deleted_at, created_at, updated_at";

const REFRESH_TOKEN_COLUMNS: &str =
    "id, user_id, token_hash, device, revoked, expires_at, created_at, updated_at";

// =============================================================================
// USERS
// =============================================================================

#[async_trait]
impl UserRepository for MySqlStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, role, name, email, password_hash, deleted_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(user.role.as_str())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.deleted_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AppError::EmailTaken),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? AND deleted_at IS NULL");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? AND deleted_at IS NULL");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
        let users = match role {
            Some(role) => {
                let sql = format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL AND role = ? ORDER BY created_at"
                );
                sqlx::query_as::<_, User>(&sql)
                    .bind(role.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY created_at"
                );
                sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?
            }
        };
        Ok(users)
    }

    async fn update_user_role(&self, user_id: &str, role: Role) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET role = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(role.as_str())
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete_user(&self, user_id: &str) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// REFRESH TOKENS
// =============================================================================

#[async_trait]
impl RefreshTokenRepository for MySqlStore {
    async fn list_refresh_tokens(&self, user_id: &str) -> Result<Vec<RefreshToken>> {
        let sql = format!(
            "SELECT {REFRESH_TOKEN_COLUMNS} FROM refresh_tokens WHERE user_id = ? ORDER BY expires_at ASC"
        );
        Ok(sqlx::query_as::<_, RefreshToken>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_live_refresh_tokens(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<RefreshToken>> {
        let sql = format!(
            "SELECT {REFRESH_TOKEN_COLUMNS} FROM refresh_tokens
             WHERE user_id = ? AND revoked = FALSE AND expires_at > ?
             ORDER BY expires_at ASC"
        );
        Ok(sqlx::query_as::<_, RefreshToken>(&sql)
            .bind(user_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, device, revoked, expires_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&token.id)
        .bind(&token.user_id)
        .bind(&token.token_hash)
        .bind(&token.device)
        .bind(token.revoked)
        .bind(token.expires_at)
        .bind(token.created_at)
        .bind(token.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn overwrite_refresh_token(
        &self,
        id: &str,
        token_hash: &str,
        device: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET token_hash = ?, device = ?, revoked = FALSE, expires_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(token_hash)
        .bind(device)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: &str,
        expected_hash: &str,
        new_hash: &str,
        device: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET token_hash = ?, device = ?, expires_at = ?, updated_at = ?
            WHERE id = ? AND token_hash = ? AND revoked = FALSE AND expires_at > ?
            "#,
        )
        .bind(new_hash)
        .bind(device)
        .bind(expires_at)
        .bind(now)
        .bind(id)
        .bind(expected_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_refresh_token(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn revoke_all_refresh_tokens(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE, updated_at = ? WHERE user_id = ? AND revoked = FALSE",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// ACCESS TOKEN BLACKLIST
// =============================================================================

#[async_trait]
impl BlacklistRepository for MySqlStore {
    async fn insert_blacklisted_token(&self, entry: &BlacklistedToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO blacklisted_tokens (id, user_id, token, reason, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(&entry.token)
        .bind(&entry.reason)
        .bind(entry.expires_at)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn is_token_blacklisted(&self, user_id: &str, token: &str) -> Result<bool> {
        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM blacklisted_tokens WHERE user_id = ? AND token = ?",
        )
        .bind(user_id)
        .bind(token)
        .fetch_one(&self.pool)
        .await?;

        Ok(result.0 > 0)
    }
}
