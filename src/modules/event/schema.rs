use axum::extract::Multipart;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::model::{Event, EventStatus};
use crate::error::{AppError, Result};
use crate::services::image_store::extension_for;

// =============================================================================
// REQUESTS
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    pub status: Option<EventStatus>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RejectRequest {
    #[validate(length(max = 2000, message = "Feedback is too long"))]
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[validate(length(min = 1, max = 2000, message = "Feedback is required"))]
    pub feedback: String,
}

/// Poster attached to a create or update request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Bytes,
    pub content_type: String,
}

/// Complete, validated event content.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_schedule"))]
pub struct EventDraft {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[validate(length(min = 1, max = 200, message = "Location is required"))]
    pub location: String,
    #[validate(length(min = 1, max = 200, message = "Speaker is required"))]
    pub speaker: String,
    #[validate(length(min = 1, max = 5000, message = "Description is required"))]
    pub description: String,
}

fn validate_schedule(draft: &EventDraft) -> std::result::Result<(), ValidationError> {
    if draft.end_time <= draft.start_time {
        let mut err = ValidationError::new("schedule");
        err.message = Some("End time must be after start time".into());
        return Err(err);
    }
    Ok(())
}

/// Fields sent in a multipart create/update form. Everything is optional
/// here; `into_draft` and `apply_to` decide what is required.
#[derive(Debug, Default)]
pub struct EventForm {
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub speaker: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageUpload>,
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation("date must be formatted YYYY-MM-DD".into()))
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| AppError::Validation(format!("{field} must be formatted HH:MM")))
}

fn required(field: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

impl EventForm {
    pub async fn from_multipart(mut multipart: Multipart, max_image_bytes: usize) -> Result<Self> {
        let mut form = EventForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == "image" {
                let content_type = field.content_type().unwrap_or("").to_string();
                if extension_for(&content_type).is_none() {
                    return Err(AppError::Validation(
                        "image must be a JPEG, PNG, WebP or GIF file".into(),
                    ));
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Read error: {e}")))?;
                if data.is_empty() {
                    return Err(AppError::Validation("image is empty".into()));
                }
                if data.len() > max_image_bytes {
                    return Err(AppError::Validation(format!(
                        "image must not exceed {max_image_bytes} bytes"
                    )));
                }
                form.image = Some(ImageUpload { data, content_type });
                continue;
            }

            let text = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Read error: {e}")))?;
            match name.as_str() {
                "name" => form.name = Some(text),
                "date" => form.date = Some(parse_date(&text)?),
                "startTime" => form.start_time = Some(parse_time("startTime", &text)?),
                "endTime" => form.end_time = Some(parse_time("endTime", &text)?),
                "location" => form.location = Some(text),
                "speaker" => form.speaker = Some(text),
                "description" => form.description = Some(text),
                _ => {}
            }
        }

        Ok(form)
    }

    /// Content and poster of a new event; every field is required.
    pub fn into_draft(self) -> Result<(EventDraft, ImageUpload)> {
        let draft = EventDraft {
            name: required("name", self.name)?.trim().to_string(),
            date: self.date.ok_or_else(|| AppError::Validation("date is required".into()))?,
            start_time: self
                .start_time
                .ok_or_else(|| AppError::Validation("startTime is required".into()))?,
            end_time: self
                .end_time
                .ok_or_else(|| AppError::Validation("endTime is required".into()))?,
            location: required("location", self.location)?.trim().to_string(),
            speaker: required("speaker", self.speaker)?.trim().to_string(),
            description: required("description", self.description)?.trim().to_string(),
        };
        draft.validate()?;

        let image = self
            .image
            .ok_or_else(|| AppError::Validation("image is required".into()))?;
        Ok((draft, image))
    }

    /// Overlays the submitted fields on `event` and validates the result.
    /// Returns the new poster, if one was sent.
    pub fn apply_to(self, event: &mut Event) -> Result<Option<ImageUpload>> {
        let draft = EventDraft {
            name: self.name.map_or_else(|| event.name.clone(), |v| v.trim().to_string()),
            date: self.date.unwrap_or(event.date),
            start_time: self.start_time.unwrap_or(event.start_time),
            end_time: self.end_time.unwrap_or(event.end_time),
            location: self.location.map_or_else(|| event.location.clone(), |v| v.trim().to_string()),
            speaker: self.speaker.map_or_else(|| event.speaker.clone(), |v| v.trim().to_string()),
            description: self
                .description
                .map_or_else(|| event.description.clone(), |v| v.trim().to_string()),
        };
        draft.validate()?;

        event.name = draft.name;
        event.date = draft.date;
        event.start_time = draft.start_time;
        event.end_time = draft.end_time;
        event.location = draft.location;
        event.speaker = draft.speaker;
        event.description = draft.description;
        Ok(self.image)
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: String,
    pub created_by: String,
    pub name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: String,
    pub speaker: String,
    pub description: String,
    pub status: EventStatus,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(e: Event) -> Self {
        Self {
            id: e.id,
            created_by: e.created_by,
            name: e.name,
            date: e.date,
            start_time: e.start_time,
            end_time: e.end_time,
            location: e.location,
            speaker: e.speaker,
            description: e.description,
            status: e.status,
            image_url: e.image_url,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}
