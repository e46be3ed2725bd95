use axum::{routing::post, Router};
use std::sync::Arc;

use crate::AppState;
use super::controller;

pub fn password_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/forgot-password", post(controller::forgot_password))
        .route("/verify-otp", post(controller::verify_otp))
        .route("/reset-password", post(controller::reset_password))
}
