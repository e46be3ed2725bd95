use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{BlacklistedToken, RefreshToken, Role, User};
use crate::error::{AppError, Result};
use crate::services::hashing;
use crate::services::jwt::JwtService;
use crate::services::metrics::MetricsRegistry;
use crate::store::Store;

/// Live refresh sessions a user may hold at once.
pub const MAX_SESSIONS: usize = 3;

pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Where a newly issued refresh token is stored.
#[derive(Debug, PartialEq, Eq)]
pub enum SlotChoice {
    Insert,
    Overwrite(String),
}

/// Picks the slot for a new refresh token. `slots` must be ordered by
/// `expires_at` ascending.
pub fn choose_slot(slots: &[RefreshToken], now: DateTime<Utc>) -> SlotChoice {
    if let Some(dead) = slots.iter().find(|s| !s.is_live(now)) {
        return SlotChoice::Overwrite(dead.id.clone());
    }
    match slots.first() {
        Some(oldest) if slots.len() >= MAX_SESSIONS => SlotChoice::Overwrite(oldest.id.clone()),
        _ => SlotChoice::Insert,
    }
}

pub struct SessionService<'a> {
    store: &'a dyn Store,
    jwt: &'a JwtService,
    metrics: &'a MetricsRegistry,
}

impl<'a> SessionService<'a> {
    pub fn new(store: &'a dyn Store, jwt: &'a JwtService, metrics: &'a MetricsRegistry) -> Self {
        Self { store, jwt, metrics }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            role: Role::Student,
            name: name.trim().to_string(),
            email: normalize_email(email),
            password_hash: hashing::hash_password(password)?,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        self.store.create_user(&user).await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Unknown email and wrong password fail with the same error.
    pub async fn login(&self, email: &str, password: &str, device: Option<&str>) -> Result<(User, TokenPair)> {
        let user = match self.store.find_user_by_email(&normalize_email(email)).await? {
            Some(user) if hashing::verify_password(password, &user.password_hash)? => user,
            _ => {
                self.metrics.auth_attempts_total.with_label_values(&["failure"]).inc();
                return Err(AppError::InvalidCredentials);
            }
        };

        let pair = self.issue_pair(&user)?;
        self.save_new_refresh_token(&user.id, &pair.refresh_token, device).await?;

        self.metrics.auth_attempts_total.with_label_values(&["success"]).inc();
        tracing::info!(user_id = %user.id, "user logged in");
        Ok((user, pair))
    }

    pub async fn save_new_refresh_token(&self, user_id: &str, raw_token: &str, device: Option<&str>) -> Result<()> {
        let now = Utc::now();
        let token_hash = hashing::hash_secret(raw_token)?;
        let expires_at = now + self.jwt.refresh_token_duration();

        let slots = self.store.list_refresh_tokens(user_id).await?;
        match choose_slot(&slots, now) {
            SlotChoice::Overwrite(id) => {
                self.store
                    .overwrite_refresh_token(&id, &token_hash, device, expires_at)
                    .await?;
            }
            SlotChoice::Insert => {
                self.store
                    .insert_refresh_token(&RefreshToken {
                        id: Uuid::new_v4().to_string(),
                        user_id: user_id.to_string(),
                        token_hash,
                        device: device.map(str::to_string),
                        revoked: false,
                        expires_at,
                        created_at: now,
                        updated_at: now,
                    })
                    .await?;
            }
        }
        Ok(())
    }

    /// Rotates the session holding `raw_old_token` and returns a new pair.
    /// The old refresh token stops working once this returns.
    pub async fn renew_access_token(&self, user: &User, raw_old_token: &str, device: Option<&str>) -> Result<TokenPair> {
        let now = Utc::now();
        let live = self.store.list_live_refresh_tokens(&user.id, now).await?;
        if live.is_empty() {
            self.metrics.session_rotations_total.with_label_values(&["no_session"]).inc();
            return Err(AppError::SessionNotFound);
        }

        let mut matched = None;
        for slot in &live {
            if hashing::verify_secret(raw_old_token, &slot.token_hash)? {
                matched = Some(slot);
                break;
            }
        }

        let Some(slot) = matched else {
            self.metrics.session_rotations_total.with_label_values(&["mismatch"]).inc();
            tracing::warn!(user_id = %user.id, "refresh token matches no live session, possible reuse");
            return Err(AppError::SessionMismatch);
        };

        let pair = self.issue_pair(user)?;
        let token_hash = hashing::hash_secret(&pair.refresh_token)?;
        let device = device.or(slot.device.as_deref());
        let rotated = self
            .store
            .rotate_refresh_token(
                &slot.id,
                &slot.token_hash,
                &token_hash,
                device,
                now + self.jwt.refresh_token_duration(),
            )
            .await?;
        if !rotated {
            self.metrics.session_rotations_total.with_label_values(&["mismatch"]).inc();
            tracing::warn!(user_id = %user.id, "refresh token rotated concurrently, possible reuse");
            return Err(AppError::SessionMismatch);
        }

        self.metrics.session_rotations_total.with_label_values(&["rotated"]).inc();
        Ok(pair)
    }

    /// Best effort: every failure is logged and swallowed.
    pub async fn logout(&self, access_token: Option<&str>, refresh_token: Option<&str>) {
        if let Some(token) = access_token {
            if let Err(e) = self.blacklist_if_valid(token).await {
                tracing::warn!(error = %e, "logout could not blacklist access token");
            }
        }
        if let Some(token) = refresh_token {
            if let Err(e) = self.revoke_session(token).await {
                tracing::warn!(error = %e, "logout could not revoke refresh session");
            }
        }
    }

    /// Resolves a bearer token to its live user.
    pub async fn authenticate(&self, access_token: &str) -> Result<User> {
        let claims = self.jwt.verify_access_token(access_token)?.claims;

        if self.store.is_token_blacklisted(&claims.sub, access_token).await? {
            return Err(AppError::TokenRevoked);
        }

        self.store
            .find_user_by_id(&claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    pub async fn blacklist_access_token(&self, token: &str, user_id: &str, reason: &str) -> Result<()> {
        let now = Utc::now();
        self.store
            .insert_blacklisted_token(&BlacklistedToken {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                token: token.to_string(),
                reason: reason.to_string(),
                expires_at: now + self.jwt.access_token_duration(),
                created_at: now,
            })
            .await
    }

    fn issue_pair(&self, user: &User) -> Result<TokenPair> {
        let signing_failed = |e: jsonwebtoken::errors::Error| AppError::Internal(format!("token signing failed: {e}"));
        Ok(TokenPair {
            access_token: self.jwt.create_access_token(&user.id, user.role).map_err(signing_failed)?,
            refresh_token: self.jwt.create_refresh_token(&user.id, user.role).map_err(signing_failed)?,
        })
    }

    async fn blacklist_if_valid(&self, token: &str) -> Result<()> {
        let claims = self.jwt.verify_access_token(token)?.claims;
        if self.store.is_token_blacklisted(&claims.sub, token).await? {
            return Ok(());
        }
        self.blacklist_access_token(token, &claims.sub, "logout").await
    }

    async fn revoke_session(&self, raw_token: &str) -> Result<()> {
        let claims = self.jwt.verify_refresh_token(raw_token)?.claims;
        let live = self.store.list_live_refresh_tokens(&claims.sub, Utc::now()).await?;
        for slot in live {
            if hashing::verify_secret(raw_token, &slot.token_hash)? {
                return self.store.revoke_refresh_token(&slot.id).await;
            }
        }
        Ok(())
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
