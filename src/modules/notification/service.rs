use serde_json::Value;

use super::model::Notification;
use super::schema::PushPayload;
use crate::error::Result;
use crate::modules::auth::model::Role;
use crate::services::metrics::MetricsRegistry;
use crate::services::realtime::{rooms_for, Notifier, Room, EVENT_UPDATED, NEW_NOTIFICATION};
use crate::store::Store;

/// Pushes committed notifications to their recipients and tells the
/// super-admin room that an event changed. Call only after the commit.
pub fn publish(
    notifier: &dyn Notifier,
    metrics: &MetricsRegistry,
    notifications: &[Notification],
    event_update: PushPayload,
) {
    for n in notifications {
        let Some(payload) = encode(PushPayload::from(n)) else {
            continue;
        };
        notifier.emit(Room::User(n.recipient_id.clone()), NEW_NOTIFICATION, payload);
        metrics.realtime_pushes_total.with_label_values(&[NEW_NOTIFICATION]).inc();
    }
    metrics.notifications_created_total.inc_by(notifications.len() as u64);

    if let Some(payload) = encode(event_update) {
        notifier.emit(Room::SuperAdmins, EVENT_UPDATED, payload);
        metrics.realtime_pushes_total.with_label_values(&[EVENT_UPDATED]).inc();
    }
}

/// Rooms a connected user belongs to right now. `None` once the account is
/// deleted, which ends the connection.
pub async fn current_rooms(store: &dyn Store, user_id: &str) -> Result<Option<Vec<Room>>> {
    let user = store.find_user_by_id(user_id).await?;
    Ok(user.map(|u| rooms_for(&u.id, u.role == Role::SuperAdmin)))
}

fn encode(payload: PushPayload) -> Option<Value> {
    serde_json::to_value(&payload)
        .inspect_err(|e| {
            tracing::error!(kind = %payload.notification_type, error = %e, "failed to encode push payload")
        })
        .ok()
}
