use async_trait::async_trait;

use super::model::{Event, EventStatus};
use crate::error::Result;
use crate::modules::notification::model::{Fanout, Notification};

/// A state or content change applied to one event.
#[derive(Debug, Clone)]
pub enum EventChange {
    Create(Event),
    /// Replaces the editable fields and the status of an existing event.
    Update(Event),
    /// Conditional status change; fails with `EventAlreadyProcessed` when the
    /// event is no longer in one of `from`.
    /// Fails with `EventAlreadyProcessed` unless the stored status may move
    /// to `to`.
    Transition { event_id: String, to: EventStatus },
    Delete { event_id: String },
}

/// Result of a committed change: the event as stored (absent after a delete)
/// and the notification rows written alongside it.
#[derive(Debug, Clone)]
pub struct CommittedChange {
    pub event: Option<Event>,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub created_by: Option<String>,
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn find_event(&self, id: &str) -> Result<Option<Event>>;
    /// Events matching `filter`, ordered by date then start time.
    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>>;
    /// Applies `change` and writes the notifications of every `fanout` in a
    /// single unit of work. Nothing is written when any step fails.
    async fn commit_event_change(&self, change: EventChange, fanout: Vec<Fanout>) -> Result<CommittedChange>;
}
