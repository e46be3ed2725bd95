use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use super::schema::{EventForm, EventResponse, FeedbackRequest, ListEventsQuery, RejectRequest};
use crate::error::Result;
use crate::extract::{AppJson, AppMultipart, AppPath, AppQuery};
use crate::modules::auth::extractor::AuthUser;
use crate::modules::auth::model::Role;
use crate::modules::auth::schema::MessageResponse;
use crate::AppState;

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppQuery(query): AppQuery<ListEventsQuery>,
) -> Result<Json<Vec<EventResponse>>> {
    let events = state.events().list(&user, query.status).await?;
    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<Json<EventResponse>> {
    let event = state.events().get(&user, &id).await?;
    Ok(Json(event.into()))
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppMultipart(multipart): AppMultipart,
) -> Result<(StatusCode, Json<EventResponse>)> {
    user.require_role(&[Role::Admin])?;

    let form = EventForm::from_multipart(multipart, state.settings.max_image_bytes).await?;
    let (draft, image) = form.into_draft()?;

    let event = state.events().create(&user, draft, image).await?;
    Ok((StatusCode::CREATED, Json(event.into())))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppMultipart(multipart): AppMultipart,
) -> Result<Json<EventResponse>> {
    user.require_role(&[Role::Admin])?;

    let form = EventForm::from_multipart(multipart, state.settings.max_image_bytes).await?;
    let event = state.events().update(&user, &id, form).await?;
    Ok(Json(event.into()))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<Json<MessageResponse>> {
    user.require_role(&[Role::Admin, Role::SuperAdmin])?;

    state.events().delete(&user, &id).await?;
    Ok(Json(MessageResponse::new("Event deleted")))
}

pub async fn approve_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<Json<EventResponse>> {
    user.require_role(&[Role::SuperAdmin])?;

    let event = state.events().approve(&user, &id).await?;
    Ok(Json(event.into()))
}

pub async fn reject_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    body: Option<AppJson<RejectRequest>>,
) -> Result<Json<EventResponse>> {
    user.require_role(&[Role::SuperAdmin])?;

    let req = body.map(|AppJson(req)| req).unwrap_or_default();
    req.validate()?;

    let event = state.events().reject(&user, &id, req.feedback).await?;
    Ok(Json(event.into()))
}

pub async fn request_revision(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<FeedbackRequest>,
) -> Result<Json<EventResponse>> {
    user.require_role(&[Role::SuperAdmin])?;
    req.validate()?;

    let event = state.events().request_revision(&user, &id, req.feedback).await?;
    Ok(Json(event.into()))
}
