use axum::{
    extract::State,
    Json,
};
use std::sync::Arc;

use super::schema::{ListUsersQuery, UpdateRoleRequest};
use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::modules::auth::extractor::AuthUser;
use crate::modules::auth::model::Role;
use crate::modules::auth::schema::{MessageResponse, UserResponse};
use crate::AppState;

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppQuery(query): AppQuery<ListUsersQuery>,
) -> Result<Json<Vec<UserResponse>>> {
    user.require_role(&[Role::SuperAdmin])?;

    let users = state.store.list_users(query.role).await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

pub async fn update_role(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<UpdateRoleRequest>,
) -> Result<Json<UserResponse>> {
    user.require_role(&[Role::SuperAdmin])?;
    if id == user.id() {
        return Err(AppError::Validation("You cannot change your own role".into()));
    }

    if !state.store.update_user_role(&id, req.role).await? {
        return Err(AppError::NotFound("User"));
    }
    let updated = state
        .store
        .find_user_by_id(&id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    tracing::info!(user_id = %id, role = %req.role, by = %user.id(), "user role changed");
    Ok(Json(UserResponse::from(&updated)))
}

/// Soft delete; the account keeps its email and loses every session.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<Json<MessageResponse>> {
    user.require_role(&[Role::SuperAdmin])?;
    if id == user.id() {
        return Err(AppError::Validation("You cannot delete your own account".into()));
    }

    if !state.store.soft_delete_user(&id).await? {
        return Err(AppError::NotFound("User"));
    }
    let sessions = state.store.revoke_all_refresh_tokens(&id).await?;

    tracing::info!(user_id = %id, sessions, by = %user.id(), "user deleted");
    Ok(Json(MessageResponse::new("User deleted")))
}
