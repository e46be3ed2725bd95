use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::AppState;
use super::controller;

pub fn event_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(controller::list_events).post(controller::create_event))
        .route(
            "/{id}",
            get(controller::get_event)
                .patch(controller::update_event)
                .delete(controller::delete_event),
        )
        .route("/{id}/approve", post(controller::approve_event))
        .route("/{id}/reject", post(controller::reject_event))
        .route("/{id}/feedback", post(controller::request_revision))
}
