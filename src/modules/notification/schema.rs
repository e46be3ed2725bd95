use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::model::{Notification, NotificationType};
use crate::modules::event::model::EventStatus;

#[derive(Debug, Default, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread: bool,
}

/// Body of `new_notification` and `eventUpdated` pushes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: &'static str,
    pub message: String,
    pub is_read: bool,
    pub data: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub event_id: Option<String>,
    pub sender_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: &'static str,
    pub message: String,
    pub data: Value,
    pub feedback: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadAllResponse {
    pub updated: u64,
}

fn event_name(n: &Notification) -> &str {
    n.data
        .0
        .get("eventName")
        .and_then(Value::as_str)
        .unwrap_or("An event")
}

impl PushPayload {
    /// Body of an `eventUpdated` push to the super-admin room.
    pub fn event_update(
        notification_type: NotificationType,
        event_id: &str,
        event_name: &str,
        action: &str,
        status: Option<EventStatus>,
    ) -> Self {
        Self {
            notification_type,
            title: notification_type.title(),
            message: notification_type.message(event_name),
            is_read: false,
            data: json!({
                "eventId": event_id,
                "eventName": event_name,
                "action": action,
                "status": status,
            }),
        }
    }
}

impl From<&Notification> for PushPayload {
    fn from(n: &Notification) -> Self {
        let mut data = n.data.0.clone();
        if let (Some(feedback), Some(fields)) = (&n.feedback, data.as_object_mut()) {
            fields.insert("feedback".into(), Value::String(feedback.clone()));
        }

        Self {
            notification_type: n.notification_type,
            title: n.notification_type.title(),
            message: n.notification_type.message(event_name(n)),
            is_read: n.is_read,
            data,
        }
    }
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        let message = n.notification_type.message(event_name(&n));
        Self {
            title: n.notification_type.title(),
            message,
            id: n.id,
            event_id: n.event_id,
            sender_id: n.sender_id,
            notification_type: n.notification_type,
            data: n.data.0,
            feedback: n.feedback,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}
