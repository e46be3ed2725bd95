use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    EventCreated,
    EventPending,
    EventUpdated,
    EventDeleted,
    EventApproved,
    EventRejected,
    EventRevised,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::EventCreated => "event_created",
            NotificationType::EventPending => "event_pending",
            NotificationType::EventUpdated => "event_updated",
            NotificationType::EventDeleted => "event_deleted",
            NotificationType::EventApproved => "event_approved",
            NotificationType::EventRejected => "event_rejected",
            NotificationType::EventRevised => "event_revised",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            NotificationType::EventCreated => "New event submitted",
            NotificationType::EventPending => "Event awaiting approval",
            NotificationType::EventUpdated => "Event updated",
            NotificationType::EventDeleted => "Event deleted",
            NotificationType::EventApproved => "Event approved",
            NotificationType::EventRejected => "Event rejected",
            NotificationType::EventRevised => "Revision requested",
        }
    }

    pub fn message(&self, event_name: &str) -> String {
        match self {
            NotificationType::EventCreated => format!("\"{event_name}\" was submitted for approval"),
            NotificationType::EventPending => format!("\"{event_name}\" is pending approval"),
            NotificationType::EventUpdated => format!("\"{event_name}\" was edited and needs review"),
            NotificationType::EventDeleted => format!("\"{event_name}\" was deleted"),
            NotificationType::EventApproved => format!("\"{event_name}\" has been approved"),
            NotificationType::EventRejected => format!("\"{event_name}\" has been rejected"),
            NotificationType::EventRevised => format!("\"{event_name}\" needs changes before approval"),
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event_created" => Ok(NotificationType::EventCreated),
            "event_pending" => Ok(NotificationType::EventPending),
            "event_updated" => Ok(NotificationType::EventUpdated),
            "event_deleted" => Ok(NotificationType::EventDeleted),
            "event_approved" => Ok(NotificationType::EventApproved),
            "event_rejected" => Ok(NotificationType::EventRejected),
            "event_revised" => Ok(NotificationType::EventRevised),
            other => Err(format!("unknown notification type: {other}")),
        }
    }
}

impl TryFrom<String> for NotificationType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Notification {
    pub id: String,
    pub event_id: Option<String>,
    pub sender_id: String,
    pub recipient_id: String,
    #[sqlx(try_from = "String")]
    pub notification_type: NotificationType,
    pub data: Json<Value>,
    pub feedback: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Who receives a notification. Super-admins are resolved inside the same
/// unit of work as the event write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    SuperAdmins,
    User(String),
}

/// A notification to persist for every resolved recipient.
#[derive(Debug, Clone)]
pub struct Fanout {
    pub recipients: Recipients,
    pub notification_type: NotificationType,
    pub sender_id: String,
    pub event_id: Option<String>,
    pub data: Value,
    pub feedback: Option<String>,
}

impl Fanout {
    /// Materialises one row per recipient.
    pub fn into_rows(self, recipient_ids: &[String], now: DateTime<Utc>) -> Vec<Notification> {
        recipient_ids
            .iter()
            .map(|recipient| Notification {
                id: uuid::Uuid::new_v4().to_string(),
                event_id: self.event_id.clone(),
                sender_id: self.sender_id.clone(),
                recipient_id: recipient.clone(),
                notification_type: self.notification_type,
                data: Json(self.data.clone()),
                feedback: self.feedback.clone(),
                is_read: false,
                created_at: now,
            })
            .collect()
    }
}
