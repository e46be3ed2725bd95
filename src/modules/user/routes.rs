use axum::{
    routing::{delete, get, patch},
    Router,
};
use std::sync::Arc;

use crate::AppState;
use super::controller;

pub fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(controller::list_users))
        .route("/{id}", delete(controller::delete_user))
        .route("/{id}/role", patch(controller::update_role))
}
