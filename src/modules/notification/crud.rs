use async_trait::async_trait;
use sqlx::{MySql, QueryBuilder, Transaction};

use super::interface::NotificationRepository;
use super::model::Notification;
use crate::error::Result;
use crate::store::mysql::MySqlStore;

const NOTIFICATION_COLUMNS: &str =
    "id, event_id, sender_id, recipient_id, notification_type, data, feedback, is_read, created_at";

/// Bulk insert inside the caller's transaction.
pub(crate) async fn insert_notifications(
    tx: &mut Transaction<'static, MySql>,
    rows: &[Notification],
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<MySql> = QueryBuilder::new(format!(
        "INSERT INTO notifications ({NOTIFICATION_COLUMNS}) "
    ));

    builder.push_values(rows, |mut b, n| {
        b.push_bind(n.id.clone())
            .push_bind(n.event_id.clone())
            .push_bind(n.sender_id.clone())
            .push_bind(n.recipient_id.clone())
            .push_bind(n.notification_type.as_str())
            .push_bind(n.data.clone())
            .push_bind(n.feedback.clone())
            .push_bind(n.is_read)
            .push_bind(n.created_at);
    });

    builder.build().execute(&mut **tx).await?;
    Ok(())
}

#[async_trait]
impl NotificationRepository for MySqlStore {
    async fn list_notifications(&self, recipient_id: &str, unread_only: bool) -> Result<Vec<Notification>> {
        let sql = if unread_only {
            format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE recipient_id = ? AND is_read = FALSE ORDER BY created_at DESC"
            )
        } else {
            format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE recipient_id = ? ORDER BY created_at DESC"
            )
        };

        Ok(sqlx::query_as::<_, Notification>(&sql)
            .bind(recipient_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn mark_notification_read(&self, id: &str, recipient_id: &str) -> Result<bool> {
        let owned: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE id = ? AND recipient_id = ?",
        )
        .bind(id)
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        if owned.0 == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = ? AND recipient_id = ?")
            .bind(id)
            .bind(recipient_id)
            .execute(&self.pool)
            .await?;

        Ok(true)
    }

    async fn mark_all_notifications_read(&self, recipient_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = ? AND is_read = FALSE",
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
