use async_trait::async_trait;

use super::model::Notification;
use crate::error::Result;

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Notifications addressed to `recipient_id`, newest first.
    async fn list_notifications(&self, recipient_id: &str, unread_only: bool) -> Result<Vec<Notification>>;
    /// Returns `false` when the notification does not exist or belongs to
    /// someone else.
    async fn mark_notification_read(&self, id: &str, recipient_id: &str) -> Result<bool>;
    async fn mark_all_notifications_read(&self, recipient_id: &str) -> Result<u64>;
}
