//! Event (appointment) model

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::errors::{Result, SecretaryBotError};
use crate::utils::helpers::{normalize_name, same_name};
use crate::utils::time::TimeRange;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub business_id: i64,
    pub description: String,
    pub services: Vec<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub professional: Option<String>,
    pub client_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Confirmed,
    /// Booked directly through an urgent fit-in request
    FitInConfirmed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Confirmed => "confirmed",
            EventStatus::FitInConfirmed => "fit_in_confirmed",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for EventStatus {
    type Error = SecretaryBotError;

    fn try_from(value: String) -> Result<Self> {
        match value.as_str() {
            "pending" => Ok(EventStatus::Pending),
            "confirmed" => Ok(EventStatus::Confirmed),
            "fit_in_confirmed" => Ok(EventStatus::FitInConfirmed),
            "cancelled" => Ok(EventStatus::Cancelled),
            other => Err(SecretaryBotError::InvalidInput(format!("Unknown event status: {}", other))),
        }
    }
}

/// Input for creating an event; the end time is derived from the duration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub description: String,
    pub services: Vec<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub professional: Option<String>,
    pub client_id: Option<i64>,
    pub status: EventStatus,
}

impl NewEvent {
    pub fn time_range(&self) -> Result<TimeRange> {
        TimeRange::from_duration(self.start_time, self.duration_minutes).ok_or_else(|| {
            SecretaryBotError::InvalidInput(format!(
                "A {} minute appointment cannot start at {}",
                self.duration_minutes,
                self.start_time.format("%H:%M")
            ))
        })
    }

    /// Materialize the event for `business_id`
    pub fn into_event(self, business_id: i64, now: DateTime<Utc>) -> Result<Event> {
        if self.description.trim().is_empty() {
            return Err(SecretaryBotError::InvalidInput("Description is required".to_string()));
        }
        let range = self.time_range()?;
        let professional = self
            .professional
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(Event {
            id: Uuid::new_v4(),
            business_id,
            description: self.description.trim().to_string(),
            services: self.services,
            date: self.date,
            start_time: range.start,
            end_time: range.end,
            professional,
            client_id: self.client_id,
            status: self.status,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Event {
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn duration_minutes(&self) -> u32 {
        self.time_range().duration_minutes()
    }

    /// Cancelled events are kept but never block a slot
    pub fn is_active(&self) -> bool {
        self.status != EventStatus::Cancelled
    }

    /// Whether this event is assigned to `name`; events without a professional match nobody
    pub fn is_assigned_to(&self, name: &str) -> bool {
        match &self.professional {
            Some(professional) if !name.trim().is_empty() => same_name(professional, name),
            _ => false,
        }
    }

    /// Normalized keys of the services this event covers, falling back to the description
    pub fn service_keys(&self) -> Vec<String> {
        let keys: Vec<String> = self
            .services
            .iter()
            .map(|s| normalize_name(s))
            .filter(|s| !s.is_empty())
            .collect();
        if keys.is_empty() {
            vec![normalize_name(&self.description)]
        } else {
            keys
        }
    }

    pub fn covers_service(&self, service_key: &str) -> bool {
        let key = normalize_name(service_key);
        self.service_keys().iter().any(|k| *k == key)
    }

    /// Copy of this event moved to another slot, as a fresh record
    pub fn relocated_copy(&self, date: NaiveDate, range: TimeRange, now: DateTime<Utc>) -> Event {
        Event {
            id: Uuid::new_v4(),
            date,
            start_time: range.start,
            end_time: range.end,
            status: EventStatus::Confirmed,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// An existing event overlapping a requested slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingInterval {
    pub event_id: Uuid,
    pub range: TimeRange,
    pub description: String,
    pub professional: Option<String>,
    pub client_id: Option<i64>,
}

impl From<&Event> for ConflictingInterval {
    fn from(event: &Event) -> Self {
        Self {
            event_id: event.id,
            range: event.time_range(),
            description: event.description.clone(),
            professional: event.professional.clone(),
            client_id: event.client_id,
        }
    }
}
