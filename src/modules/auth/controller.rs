use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use validator::Validate;

use super::cookie::{clear_refresh_cookie, read_refresh_cookie, refresh_cookie};
use super::extractor::{AuthUser, RequestMeta};
use super::schema::{
    LoginRequest, LoginResponse, MessageResponse, RefreshTokenResponse, RegisterRequest,
    RegisterResponse, UserResponse,
};
use crate::error::{AppError, Result};
use crate::extract::AppJson;
use crate::AppState;

pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    req.validate()?;

    let user = state
        .sessions()
        .register(&req.name, &req.email, &req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserResponse::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    meta: RequestMeta,
    jar: CookieJar,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    req.validate()?;

    let (user, pair) = state
        .sessions()
        .login(&req.email, &req.password, meta.user_agent.as_deref())
        .await
        .inspect_err(|e| {
            if matches!(e, AppError::InvalidCredentials) {
                tracing::warn!(ip = %meta.ip, method = %meta.method, url = %meta.url, "login failed");
            }
        })?;

    let cookie = refresh_cookie(
        pair.refresh_token,
        state.jwt_service.refresh_token_duration(),
        state.settings.cookie_secure,
    );

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            access_token: pair.access_token,
            token_type: "Bearer",
            expires_in: state.jwt_service.get_access_token_duration_secs(),
            user: UserResponse::from(&user),
        }),
    ))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    meta: RequestMeta,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    let raw = read_refresh_cookie(&jar).ok_or(AppError::MissingToken)?;

    let result = async {
        let claims = state.jwt_service.verify_refresh_token(&raw)?.claims;
        let user = state
            .store
            .find_user_by_id(&claims.sub)
            .await?
            .ok_or(AppError::SessionNotFound)?;
        state
            .sessions()
            .renew_access_token(&user, &raw, meta.user_agent.as_deref())
            .await
    }
    .await;

    let pair = result.inspect_err(|e| {
        tracing::warn!(
            ip = %meta.ip,
            method = %meta.method,
            url = %meta.url,
            code = e.error_code(),
            "refresh rejected"
        );
    })?;

    let cookie = refresh_cookie(
        pair.refresh_token,
        state.jwt_service.refresh_token_duration(),
        state.settings.cookie_secure,
    );

    Ok((
        jar.add(cookie),
        Json(RefreshTokenResponse {
            access_token: pair.access_token,
            token_type: "Bearer",
            expires_in: state.jwt_service.get_access_token_duration_secs(),
        }),
    ))
}

/// Always succeeds and clears the refresh cookie.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    let access_token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    let refresh_token = read_refresh_cookie(&jar);

    state
        .sessions()
        .logout(access_token, refresh_token.as_deref())
        .await;

    (
        clear_refresh_cookie(jar, state.settings.cookie_secure),
        Json(MessageResponse::new("Logged out successfully")),
    )
}

pub async fn me(user: AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user.0))
}
