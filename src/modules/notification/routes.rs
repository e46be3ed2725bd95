use axum::{
    routing::{get, patch},
    Router,
};
use std::sync::Arc;

use crate::AppState;
use super::controller;

pub fn notification_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(controller::list_notifications))
        .route("/read-all", patch(controller::mark_all_read))
        .route("/{id}/read", patch(controller::mark_read))
}
