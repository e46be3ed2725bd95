use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, QueryBuilder, Transaction};

use super::interface::{CommittedChange, EventChange, EventFilter, EventRepository};
use super::model::Event;
use crate::error::{AppError, Result};
use crate::modules::notification::crud::insert_notifications;
use crate::modules::notification::model::{Fanout, Recipients};
use crate::store::mysql::MySqlStore;

const EVENT_COLUMNS: &str = "id, created_by, name, date, start_time, end_time, location, speaker, \
     description, status, image_url, image_key, created_at, updated_at";

async fn lock_event(tx: &mut Transaction<'static, MySql>, id: &str) -> Result<Event> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ? FOR UPDATE");
    sqlx::query_as::<_, Event>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::NotFound("Event"))
}

async fn resolve_recipients(
    tx: &mut Transaction<'static, MySql>,
    recipients: &Recipients,
) -> Result<Vec<String>> {
    match recipients {
        Recipients::User(id) => Ok(vec![id.clone()]),
        Recipients::SuperAdmins => {
            let ids: Vec<(String,)> = sqlx::query_as(
                "SELECT id FROM users WHERE role = 'super_admin' AND deleted_at IS NULL ORDER BY created_at",
            )
            .fetch_all(&mut **tx)
            .await?;
            Ok(ids.into_iter().map(|(id,)| id).collect())
        }
    }
}

#[async_trait]
impl EventRepository for MySqlStore {
    async fn find_event(&self, id: &str) -> Result<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?");
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let mut builder: QueryBuilder<MySql> =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE 1 = 1"));

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(created_by) = &filter.created_by {
            builder.push(" AND created_by = ").push_bind(created_by.clone());
        }
        builder.push(" ORDER BY date ASC, start_time ASC");

        Ok(builder
            .build_query_as::<Event>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn commit_event_change(&self, change: EventChange, fanout: Vec<Fanout>) -> Result<CommittedChange> {
        let now = Utc::now();
        // Dropping `tx` on an early return rolls everything back.
        let mut tx = self.pool.begin().await?;

        let event = match change {
            EventChange::Create(event) => {
                sqlx::query(&format!(
                    "INSERT INTO events ({EVENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ))
                .bind(&event.id)
                .bind(&event.created_by)
                .bind(&event.name)
                .bind(event.date)
                .bind(event.start_time)
                .bind(event.end_time)
                .bind(&event.location)
                .bind(&event.speaker)
                .bind(&event.description)
                .bind(event.status.as_str())
                .bind(&event.image_url)
                .bind(&event.image_key)
                .bind(event.created_at)
                .bind(event.updated_at)
                .execute(&mut *tx)
                .await?;
                Some(event)
            }
            EventChange::Update(event) => {
                lock_event(&mut tx, &event.id).await?;
                sqlx::query(
                    r#"
                    UPDATE events
                    SET name = ?, date = ?, start_time = ?, end_time = ?, location = ?, speaker = ?,
                        description = ?, status = ?, image_url = ?, image_key = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&event.name)
                .bind(event.date)
                .bind(event.start_time)
                .bind(event.end_time)
                .bind(&event.location)
                .bind(&event.speaker)
                .bind(&event.description)
                .bind(event.status.as_str())
                .bind(&event.image_url)
                .bind(&event.image_key)
                .bind(event.updated_at)
                .bind(&event.id)
                .execute(&mut *tx)
                .await?;
                Some(event)
            }
            EventChange::Transition { event_id, to } => {
                let mut current = lock_event(&mut tx, &event_id).await?;
                if !current.status.can_transition_to(to) {
                    return Err(AppError::EventAlreadyProcessed);
                }
                sqlx::query("UPDATE events SET status = ?, updated_at = ? WHERE id = ?")
                    .bind(to.as_str())
                    .bind(now)
                    .bind(&event_id)
                    .execute(&mut *tx)
                    .await?;
                current.status = to;
                current.updated_at = now;
                Some(current)
            }
            EventChange::Delete { event_id } => {
                lock_event(&mut tx, &event_id).await?;
                sqlx::query("DELETE FROM events WHERE id = ?")
                    .bind(&event_id)
                    .execute(&mut *tx)
                    .await?;
                None
            }
        };

        let mut notifications = Vec::new();
        for item in fanout {
            let recipient_ids = resolve_recipients(&mut tx, &item.recipients).await?;
            notifications.extend(item.into_rows(&recipient_ids, now));
        }
        insert_notifications(&mut tx, &notifications).await?;

        tx.commit().await?;

        Ok(CommittedChange {
            event,
            notifications,
        })
    }
}
