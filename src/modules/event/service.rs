use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::interface::{CommittedChange, EventChange, EventFilter};
use super::model::{Event, EventStatus};
use super::schema::{EventDraft, EventForm, ImageUpload};
use crate::error::{AppError, Result};
use crate::modules::auth::model::{Role, User};
use crate::modules::notification::model::{Fanout, NotificationType, Recipients};
use crate::modules::notification::schema::PushPayload;
use crate::modules::notification::service::publish;
use crate::services::image_store::{ImageStore, StoredImage};
use crate::services::metrics::MetricsRegistry;
use crate::services::realtime::Notifier;
use crate::store::Store;

/// Whether `viewer` may see `event` at all. Hidden events read as missing.
pub fn is_visible_to(event: &Event, viewer: &User) -> bool {
    match viewer.role {
        Role::SuperAdmin => true,
        Role::Admin => event.created_by == viewer.id,
        Role::Student => event.status == EventStatus::Approved,
    }
}

fn fanout(
    recipients: Recipients,
    notification_type: NotificationType,
    sender: &User,
    event: &Event,
    feedback: Option<String>,
) -> Fanout {
    Fanout {
        recipients,
        notification_type,
        sender_id: sender.id.clone(),
        event_id: Some(event.id.clone()),
        data: json!({
            "eventId": event.id,
            "eventName": event.name,
            "senderName": sender.name,
        }),
        feedback,
    }
}

pub struct EventService<'a> {
    store: &'a dyn Store,
    images: &'a dyn ImageStore,
    notifier: &'a dyn Notifier,
    metrics: &'a MetricsRegistry,
}

impl<'a> EventService<'a> {
    pub fn new(
        store: &'a dyn Store,
        images: &'a dyn ImageStore,
        notifier: &'a dyn Notifier,
        metrics: &'a MetricsRegistry,
    ) -> Self {
        Self {
            store,
            images,
            notifier,
            metrics,
        }
    }

    pub async fn list(&self, viewer: &User, status: Option<EventStatus>) -> Result<Vec<Event>> {
        let filter = match viewer.role {
            Role::Student => {
                if status.is_some_and(|s| s != EventStatus::Approved) {
                    return Ok(Vec::new());
                }
                EventFilter {
                    status: Some(EventStatus::Approved),
                    created_by: None,
                }
            }
            Role::Admin => EventFilter {
                status,
                created_by: Some(viewer.id.clone()),
            },
            Role::SuperAdmin => EventFilter {
                status,
                created_by: None,
            },
        };
        self.store.list_events(&filter).await
    }

    pub async fn get(&self, viewer: &User, id: &str) -> Result<Event> {
        self.store
            .find_event(id)
            .await?
            .filter(|e| is_visible_to(e, viewer))
            .ok_or(AppError::NotFound("Event"))
    }

    pub async fn create(&self, actor: &User, draft: EventDraft, image: ImageUpload) -> Result<Event> {
        let stored = self.upload(image).await?;

        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4().to_string(),
            created_by: actor.id.clone(),
            name: draft.name,
            date: draft.date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            location: draft.location,
            speaker: draft.speaker,
            description: draft.description,
            status: EventStatus::Pending,
            image_url: stored.url,
            image_key: stored.key.clone(),
            created_at: now,
            updated_at: now,
        };

        let notifications = vec![
            fanout(Recipients::SuperAdmins, NotificationType::EventCreated, actor, &event, None),
            fanout(
                Recipients::User(actor.id.clone()),
                NotificationType::EventPending,
                actor,
                &event,
                None,
            ),
        ];

        let committed = self
            .commit_with_upload(EventChange::Create(event), notifications, &stored.key)
            .await?;
        self.after_commit("created", NotificationType::EventCreated, &committed);
        self.committed_event(committed)
    }

    /// Edits an event owned by `actor` and sends it back for review.
    pub async fn update(&self, actor: &User, id: &str, form: EventForm) -> Result<Event> {
        let mut event = self.owned_by(actor, id).await?;
        let old_key = event.image_key.clone();

        let new_image = form.apply_to(&mut event)?;
        event.status = EventStatus::Pending;
        event.updated_at = Utc::now();

        let notifications = vec![fanout(
            Recipients::SuperAdmins,
            NotificationType::EventUpdated,
            actor,
            &event,
            None,
        )];

        let committed = match new_image {
            Some(image) => {
                let stored = self.upload(image).await?;
                event.image_url = stored.url;
                event.image_key = stored.key.clone();
                let committed = self
                    .commit_with_upload(EventChange::Update(event), notifications, &stored.key)
                    .await?;
                self.discard_image(&old_key).await;
                committed
            }
            None => {
                self.store
                    .commit_event_change(EventChange::Update(event), notifications)
                    .await?
            }
        };

        self.after_commit("updated", NotificationType::EventUpdated, &committed);
        self.committed_event(committed)
    }

    /// Owners delete their own events; super-admins delete any event.
    pub async fn delete(&self, actor: &User, id: &str) -> Result<()> {
        let event = match actor.role {
            Role::SuperAdmin => self
                .store
                .find_event(id)
                .await?
                .ok_or(AppError::NotFound("Event"))?,
            Role::Admin => self.owned_by(actor, id).await?,
            Role::Student => return Err(AppError::Forbidden),
        };

        let recipients = if actor.role == Role::SuperAdmin {
            Recipients::User(event.created_by.clone())
        } else {
            Recipients::SuperAdmins
        };
        // The row is gone after commit; the id survives only in `data`.
        let mut deleted = fanout(recipients, NotificationType::EventDeleted, actor, &event, None);
        deleted.event_id = None;
        let notifications = vec![deleted];

        let committed = self
            .store
            .commit_event_change(
                EventChange::Delete {
                    event_id: event.id.clone(),
                },
                notifications,
            )
            .await?;

        self.discard_image(&event.image_key).await;
        self.after_commit_for(&event, "deleted", NotificationType::EventDeleted, None, &committed);
        Ok(())
    }

    pub async fn approve(&self, actor: &User, id: &str) -> Result<Event> {
        self.decide(actor, id, EventStatus::Approved, NotificationType::EventApproved, None)
            .await
    }

    pub async fn reject(&self, actor: &User, id: &str, feedback: Option<String>) -> Result<Event> {
        let feedback = feedback.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
        self.decide(actor, id, EventStatus::Rejected, NotificationType::EventRejected, feedback)
            .await
    }

    pub async fn request_revision(&self, actor: &User, id: &str, feedback: String) -> Result<Event> {
        let feedback = feedback.trim().to_string();
        if feedback.is_empty() {
            return Err(AppError::Validation("Feedback is required".into()));
        }
        self.decide(actor, id, EventStatus::Revised, NotificationType::EventRevised, Some(feedback))
            .await
    }

    async fn decide(
        &self,
        actor: &User,
        id: &str,
        target: EventStatus,
        notification_type: NotificationType,
        feedback: Option<String>,
    ) -> Result<Event> {
        let event = self
            .store
            .find_event(id)
            .await?
            .ok_or(AppError::NotFound("Event"))?;

        let notifications = vec![fanout(
            Recipients::User(event.created_by.clone()),
            notification_type,
            actor,
            &event,
            feedback,
        )];

        let committed = self
            .store
            .commit_event_change(
                EventChange::Transition {
                    event_id: event.id.clone(),
                    to: target,
                },
                notifications,
            )
            .await
            .inspect_err(|e| {
                if matches!(e, AppError::EventAlreadyProcessed) {
                    tracing::info!(event_id = %event.id, target = %target, "event already processed");
                }
            })?;

        tracing::info!(event_id = %event.id, actor = %actor.id, status = %target, "event decided");
        self.after_commit(target.as_str(), notification_type, &committed);
        self.committed_event(committed)
    }

    async fn owned_by(&self, actor: &User, id: &str) -> Result<Event> {
        self.store
            .find_event(id)
            .await?
            .filter(|e| e.created_by == actor.id)
            .ok_or(AppError::NotFound("Event"))
    }

    async fn upload(&self, image: ImageUpload) -> Result<StoredImage> {
        self.images.upload(image.data, &image.content_type).await
    }

    /// Commits `change`; if that fails the freshly uploaded poster is removed.
    async fn commit_with_upload(
        &self,
        change: EventChange,
        notifications: Vec<Fanout>,
        uploaded_key: &str,
    ) -> Result<CommittedChange> {
        match self.store.commit_event_change(change, notifications).await {
            Ok(committed) => Ok(committed),
            Err(e) => {
                self.discard_image(uploaded_key).await;
                Err(e)
            }
        }
    }

    async fn discard_image(&self, key: &str) {
        if let Err(e) = self.images.delete(key).await {
            tracing::warn!(key, error = %e, "failed to delete event image");
        }
    }

    fn after_commit(&self, action: &str, kind: NotificationType, committed: &CommittedChange) {
        if let Some(event) = &committed.event {
            self.after_commit_for(event, action, kind, Some(event.status), committed);
        }
    }

    fn after_commit_for(
        &self,
        event: &Event,
        action: &str,
        kind: NotificationType,
        status: Option<EventStatus>,
        committed: &CommittedChange,
    ) {
        self.metrics.event_actions_total.with_label_values(&[action]).inc();
        publish(
            self.notifier,
            self.metrics,
            &committed.notifications,
            PushPayload::event_update(kind, &event.id, &event.name, action, status),
        );
    }

    fn committed_event(&self, committed: CommittedChange) -> Result<Event> {
        committed
            .event
            .ok_or_else(|| AppError::Internal("committed change returned no event".into()))
    }
}
