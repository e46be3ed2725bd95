use axum::{extract::State, Json};
use std::sync::Arc;
use validator::Validate;

use super::schema::{ForgotPasswordRequest, ResetPasswordRequest, VerifyOtpRequest, VerifyOtpResponse};
use crate::error::Result;
use crate::extract::AppJson;
use crate::modules::auth::schema::MessageResponse;
use crate::AppState;

const RESET_REQUESTED: &str = "If that email is registered, a verification code has been sent";

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    req.validate()?;

    state.passwords().request_reset(&req.email).await?;

    Ok(Json(MessageResponse::new(RESET_REQUESTED)))
}

pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>> {
    req.validate()?;

    let reset_token = state.passwords().verify_otp(&req.email, req.otp.trim()).await?;

    Ok(Json(VerifyOtpResponse {
        message: "OTP verified",
        reset_token,
    }))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    req.validate()?;

    state
        .passwords()
        .reset_password(&req.email, &req.reset_token, &req.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password has been reset, please log in again")))
}
