//! Request extractors: the authenticated caller and request metadata used in
//! security logs.

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use super::model::{Role, User};
use crate::error::AppError;
use crate::AppState;

/// Client address, method and URL of the current request.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub ip: String,
    pub method: String,
    pub url: String,
    pub user_agent: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(request_meta(parts))
    }
}

fn request_meta(parts: &Parts) -> RequestMeta {
    let ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .or_else(|| {
            parts
                .headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|v| v.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string());

    let user_agent = parts
        .headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    RequestMeta {
        ip,
        method: parts.method.to_string(),
        url: parts.uri.to_string(),
        user_agent,
    }
}

/// Raw bearer token from the `Authorization` header, if any.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The authenticated, live caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    /// Fails with `Forbidden` unless the caller holds one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.0.role) {
            Ok(())
        } else {
            tracing::warn!(user_id = %self.0.id, role = %self.0.role, "role check failed");
            Err(AppError::Forbidden)
        }
    }
}

impl std::ops::Deref for AuthUser {
    type Target = User;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let result = match bearer_token(parts) {
            Some(token) => state.sessions().authenticate(token).await,
            None => Err(AppError::MissingToken),
        };

        result.map(AuthUser).inspect_err(|e| {
            let meta = request_meta(parts);
            tracing::warn!(
                ip = %meta.ip,
                method = %meta.method,
                url = %meta.url,
                code = e.error_code(),
                "authentication failed"
            );
        })
    }
}
