use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Revised,
    Approved,
    Rejected,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Revised => "revised",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
        }
    }

    /// Source states a super-admin decision may be applied to.
    pub fn sources_for(target: EventStatus) -> &'static [EventStatus] {
        match target {
            EventStatus::Approved | EventStatus::Rejected => {
                &[EventStatus::Pending, EventStatus::Revised]
            }
            EventStatus::Revised => &[EventStatus::Pending],
            EventStatus::Pending => &[],
        }
    }

    pub fn can_transition_to(self, target: EventStatus) -> bool {
        EventStatus::sources_for(target).contains(&self)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EventStatus::Pending),
            "revised" => Ok(EventStatus::Revised),
            "approved" => Ok(EventStatus::Approved),
            "rejected" => Ok(EventStatus::Rejected),
            other => Err(format!("unknown event status: {other}")),
        }
    }
}

impl TryFrom<String> for EventStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Event {
    pub id: String,
    pub created_by: String,
    pub name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: String,
    pub speaker: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub status: EventStatus,
    pub image_url: String,
    pub image_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
