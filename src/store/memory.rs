//! In-process backend used by the test suite and local runs without MySQL.
//! Every call takes the single lock once, so each repository method is one
//! atomic unit of work just like a database transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{AppError, Result};
use crate::modules::auth::interface::{BlacklistRepository, RefreshTokenRepository, UserRepository};
use crate::modules::auth::model::{BlacklistedToken, RefreshToken, Role, User};
use crate::modules::event::interface::{CommittedChange, EventChange, EventFilter, EventRepository};
use crate::modules::event::model::Event;
use crate::modules::notification::interface::NotificationRepository;
use crate::modules::notification::model::{Fanout, Notification, Recipients};
use crate::modules::password::interface::{OtpRepository, ResetTokenRepository};
use crate::modules::password::model::{Otp, ResetToken};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    refresh_tokens: Vec<RefreshToken>,
    blacklist: Vec<BlacklistedToken>,
    otps: Vec<Otp>,
    reset_tokens: Vec<ResetToken>,
    events: HashMap<String, Event>,
    notifications: Vec<Notification>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_event_commits: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `commit_event_change` fail before writing.
    pub fn fail_event_commits(&self, fail: bool) {
        self.fail_event_commits.store(fail, Ordering::SeqCst);
    }

    /// Stored reset-token rows of a user, expired ones included.
    pub fn reset_token_count(&self, user_id: &str) -> usize {
        self.lock()
            .reset_tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn super_admin_ids(users: &[User]) -> Vec<String> {
    users
        .iter()
        .filter(|u| u.role == Role::SuperAdmin && u.is_active())
        .map(|u| u.id.clone())
        .collect()
}

// =============================================================================
// USERS
// =============================================================================

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        let mut tables = self.lock();
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::EmailTaken);
        }
        tables.users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.id == id && u.is_active())
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.email == email && u.is_active())
            .cloned())
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
        let mut users: Vec<User> = self
            .lock()
            .users
            .iter()
            .filter(|u| u.is_active() && role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn update_user_role(&self, user_id: &str, role: Role) -> Result<bool> {
        let mut tables = self.lock();
        match tables.users.iter_mut().find(|u| u.id == user_id && u.is_active()) {
            Some(user) => {
                user.role = role;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn soft_delete_user(&self, user_id: &str) -> Result<bool> {
        let now = Utc::now();
        let mut tables = self.lock();
        let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id && u.is_active()) else {
            return Ok(false);
        };
        user.deleted_at = Some(now);
        user.updated_at = now;
        Ok(true)
    }
}

// =============================================================================
// REFRESH TOKENS
// =============================================================================

#[async_trait]
impl RefreshTokenRepository for MemoryStore {
    async fn list_refresh_tokens(&self, user_id: &str) -> Result<Vec<RefreshToken>> {
        let mut tokens: Vec<RefreshToken> = self
            .lock()
            .refresh_tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tokens.sort_by_key(|t| t.expires_at);
        Ok(tokens)
    }

    async fn list_live_refresh_tokens(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<RefreshToken>> {
        let mut tokens: Vec<RefreshToken> = self
            .lock()
            .refresh_tokens
            .iter()
            .filter(|t| t.user_id == user_id && t.is_live(now))
            .cloned()
            .collect();
        tokens.sort_by_key(|t| t.expires_at);
        Ok(tokens)
    }

    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<()> {
        self.lock().refresh_tokens.push(token.clone());
        Ok(())
    }

    async fn overwrite_refresh_token(
        &self,
        id: &str,
        token_hash: &str,
        device: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tables = self.lock();
        if let Some(slot) = tables.refresh_tokens.iter_mut().find(|t| t.id == id) {
            slot.token_hash = token_hash.to_string();
            slot.device = device.map(str::to_string);
            slot.revoked = false;
            slot.expires_at = expires_at;
            slot.updated_at = Utc::now();
        }
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
        let mut tables = self.lock();
        let Some(slot) = tables
            .refresh_tokens
            .iter_mut()
            .find(|t| t.id == id && t.token_hash == expected_hash && t.is_live(now))
        else {
            return Ok(false);
        };
        slot.token_hash = new_hash.to_string();
        slot.device = device.map(str::to_string);
        slot.expires_at = expires_at;
        slot.updated_at = now;
        Ok(true)
    }

    async fn revoke_refresh_token(&self, id: &str) -> Result<()> {
        let mut tables = self.lock();
        if let Some(slot) = tables.refresh_tokens.iter_mut().find(|t| t.id == id) {
            slot.revoked = true;
            slot.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn revoke_all_refresh_tokens(&self, user_id: &str) -> Result<u64> {
        let now = Utc::now();
        let mut revoked = 0;
        for slot in self
            .lock()
            .refresh_tokens
            .iter_mut()
            .filter(|t| t.user_id == user_id && !t.revoked)
        {
            slot.revoked = true;
            slot.updated_at = now;
            revoked += 1;
        }
        Ok(revoked)
    }
}

// =============================================================================
// ACCESS TOKEN BLACKLIST
// =============================================================================

#[async_trait]
impl BlacklistRepository for MemoryStore {
    async fn insert_blacklisted_token(&self, entry: &BlacklistedToken) -> Result<()> {
        self.lock().blacklist.push(entry.clone());
        Ok(())
    }

    async fn is_token_blacklisted(&self, user_id: &str, token: &str) -> Result<bool> {
        Ok(self
            .lock()
            .blacklist
            .iter()
            .any(|b| b.user_id == user_id && b.token == token))
    }
}

// =============================================================================
// OTP / RESET TOKENS
// =============================================================================

#[async_trait]
impl OtpRepository for MemoryStore {
    async fn issue_otp(&self, otp: &Otp, now: DateTime<Utc>) -> Result<()> {
        let mut tables = self.lock();
        for existing in tables
            .otps
            .iter_mut()
            .filter(|o| o.user_id == otp.user_id && o.is_valid(now))
        {
            existing.revoked_at = Some(now);
        }
        tables.otps.push(otp.clone());
        Ok(())
    }

    async fn find_latest_otp(&self, user_id: &str) -> Result<Option<Otp>> {
        // max_by_key keeps the last maximum, so insertion order breaks ties.
        Ok(self
            .lock()
            .otps
            .iter()
            .filter(|o| o.user_id == user_id)
            .max_by_key(|o| o.created_at)
            .cloned())
    }

    async fn record_failed_otp_attempt(&self, id: &str, max_attempts: i32, now: DateTime<Utc>) -> Result<Option<i32>> {
        let mut tables = self.lock();
        let Some(otp) = tables
            .otps
            .iter_mut()
            .find(|o| o.id == id && o.verified_at.is_none() && o.revoked_at.is_none())
        else {
            return Ok(None);
        };
        otp.attempts += 1;
        if otp.attempts >= max_attempts {
            otp.revoked_at = Some(now);
        }
        Ok(Some(otp.attempts))
    }

    async fn mark_otp_verified(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut tables = self.lock();
        match tables.otps.iter_mut().find(|o| o.id == id && o.is_valid(now)) {
            Some(otp) => {
                otp.verified_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ResetTokenRepository for MemoryStore {
    async fn insert_reset_token(&self, token: &ResetToken) -> Result<()> {
        self.lock().reset_tokens.push(token.clone());
        Ok(())
    }

    async fn list_live_reset_tokens(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<ResetToken>> {
        let mut tokens: Vec<ResetToken> = self
            .lock()
            .reset_tokens
            .iter()
            .filter(|t| t.user_id == user_id && t.expires_at > now)
            .cloned()
            .collect();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tokens)
    }

    async fn complete_password_reset(&self, user_id: &str, password_hash: &str) -> Result<()> {
        let now = Utc::now();
        let mut tables = self.lock();

        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.password_hash = password_hash.to_string();
            user.updated_at = now;
        }
        tables.reset_tokens.retain(|t| t.user_id != user_id);
        for slot in tables.refresh_tokens.iter_mut().filter(|t| t.user_id == user_id) {
            slot.revoked = true;
            slot.updated_at = now;
        }
        Ok(())
    }
}

// =============================================================================
// EVENTS
// =============================================================================

#[async_trait]
impl EventRepository for MemoryStore {
    async fn find_event(&self, id: &str) -> Result<Option<Event>> {
        Ok(self.lock().events.get(id).cloned())
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self
            .lock()
            .events
            .values()
            .filter(|e| filter.status.map_or(true, |s| e.status == s))
            .filter(|e| filter.created_by.as_ref().map_or(true, |c| &e.created_by == c))
            .cloned()
            .collect();
        events.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
        Ok(events)
    }

    async fn commit_event_change(&self, change: EventChange, fanout: Vec<Fanout>) -> Result<CommittedChange> {
        if self.fail_event_commits.load(Ordering::SeqCst) {
            return Err(AppError::Internal("event commit disabled".into()));
        }

        let now = Utc::now();
        let mut tables = self.lock();

        // Validate first, write after: an error leaves the tables untouched.
        let event = match change {
            EventChange::Create(event) => {
                tables.events.insert(event.id.clone(), event.clone());
                Some(event)
            }
            EventChange::Update(event) => {
                if !tables.events.contains_key(&event.id) {
                    return Err(AppError::NotFound("Event"));
                }
                tables.events.insert(event.id.clone(), event.clone());
                Some(event)
            }
            EventChange::Transition { event_id, to } => {
                let current = tables
                    .events
                    .get_mut(&event_id)
                    .ok_or(AppError::NotFound("Event"))?;
                if !current.status.can_transition_to(to) {
                    return Err(AppError::EventAlreadyProcessed);
                }
                current.status = to;
                current.updated_at = now;
                Some(current.clone())
            }
            EventChange::Delete { event_id } => {
                if tables.events.remove(&event_id).is_none() {
                    return Err(AppError::NotFound("Event"));
                }
                for n in tables
                    .notifications
                    .iter_mut()
                    .filter(|n| n.event_id.as_deref() == Some(event_id.as_str()))
                {
                    n.event_id = None;
                }
                None
            }
        };

        let mut rows = Vec::new();
        for item in fanout {
            let recipient_ids = match &item.recipients {
                Recipients::SuperAdmins => super_admin_ids(&tables.users),
                Recipients::User(id) => vec![id.clone()],
            };
            rows.extend(item.into_rows(&recipient_ids, now));
        }
        tables.notifications.extend(rows.iter().cloned());

        Ok(CommittedChange {
            event,
            notifications: rows,
        })
    }
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn list_notifications(&self, recipient_id: &str, unread_only: bool) -> Result<Vec<Notification>> {
        let mut rows: Vec<Notification> = self
            .lock()
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        // Stable sort keeps insertion order reversed for equal timestamps.
        rows.reverse();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn mark_notification_read(&self, id: &str, recipient_id: &str) -> Result<bool> {
        let mut tables = self.lock();
        match tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient_id == recipient_id)
        {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, recipient_id: &str) -> Result<u64> {
        let mut marked = 0;
        for n in self
            .lock()
            .notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
        {
            n.is_read = true;
            marked += 1;
        }
        Ok(marked)
    }
}
