//! Fit-in pendency model
//!
//! A pendency is a persisted relocation proposal: one urgent request, the
//! existing bookings that could make room for it, and the free slots offered
//! to each affected client.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::event::Event;
use crate::utils::errors::{Result, SecretaryBotError};
use crate::utils::helpers::{format_date, format_time};
use crate::utils::time::TimeRange;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FitInPendency {
    pub id: Uuid,
    pub business_id: i64,
    pub requester_id: i64,
    pub description: String,
    pub desired_date: NaiveDate,
    pub desired_time: NaiveTime,
    pub duration_minutes: i32,
    pub professional: Option<String>,
    #[sqlx(json)]
    pub candidates: Vec<RelocationCandidate>,
    #[sqlx(try_from = "String")]
    pub status: PendencyStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendencyStatus {
    Pending,
    Concluded,
    NoCandidate,
    NoSlotAvailable,
    Superseded,
    Expired,
}

impl PendencyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendencyStatus::Pending => "pending",
            PendencyStatus::Concluded => "concluded",
            PendencyStatus::NoCandidate => "no_candidate",
            PendencyStatus::NoSlotAvailable => "no_slot_available",
            PendencyStatus::Superseded => "superseded",
            PendencyStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self != PendencyStatus::Pending
    }
}

impl fmt::Display for PendencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for PendencyStatus {
    type Error = SecretaryBotError;

    fn try_from(value: String) -> Result<Self> {
        match value.as_str() {
            "pending" => Ok(PendencyStatus::Pending),
            "concluded" => Ok(PendencyStatus::Concluded),
            "no_candidate" => Ok(PendencyStatus::NoCandidate),
            "no_slot_available" => Ok(PendencyStatus::NoSlotAvailable),
            "superseded" => Ok(PendencyStatus::Superseded),
            "expired" => Ok(PendencyStatus::Expired),
            other => Err(SecretaryBotError::InvalidInput(format!("Unknown pendency status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateResponse {
    Awaiting,
    Relocated,
    /// Another candidate accepted first, or the pendency lapsed
    Superseded,
}

/// A free slot offered to a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeSlot {
    pub date: NaiveDate,
    pub range: TimeRange,
}

impl fmt::Display for AlternativeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} às {}", format_date(self.date), format_time(self.range.start))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelocationCandidate {
    pub event_id: Uuid,
    pub affected_client_id: i64,
    /// The booking as it was when the proposal was made
    pub original_event: Event,
    pub alternatives: Vec<AlternativeSlot>,
    pub response: CandidateResponse,
}

impl FitInPendency {
    pub fn desired_range(&self) -> Result<TimeRange> {
        let minutes = u32::try_from(self.duration_minutes)
            .map_err(|_| SecretaryBotError::InvalidInput("Negative fit-in duration".to_string()))?;
        TimeRange::from_duration(self.desired_time, minutes)
            .ok_or_else(|| SecretaryBotError::InvalidInput("Fit-in does not fit in the day".to_string()))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn awaiting_candidate(&self, client_id: i64) -> Option<&RelocationCandidate> {
        self.candidates
            .iter()
            .find(|c| c.affected_client_id == client_id && c.response == CandidateResponse::Awaiting)
    }

    /// Record the winning candidate and supersede the others.
    ///
    /// Returns the client ids of the superseded candidates.
    pub fn conclude(&mut self, client_id: i64, now: DateTime<Utc>) -> Result<Vec<i64>> {
        if self.status != PendencyStatus::Pending {
            return Err(SecretaryBotError::InvalidStateTransition {
                from: self.status.to_string(),
                to: PendencyStatus::Concluded.to_string(),
            });
        }

        let mut superseded = Vec::new();
        for candidate in self.candidates.iter_mut() {
            if candidate.affected_client_id == client_id && candidate.response == CandidateResponse::Awaiting {
                candidate.response = CandidateResponse::Relocated;
            } else if candidate.response == CandidateResponse::Awaiting {
                candidate.response = CandidateResponse::Superseded;
                superseded.push(candidate.affected_client_id);
            }
        }
        self.status = PendencyStatus::Concluded;
        self.updated_at = now;
        Ok(superseded)
    }

    /// Close a pending pendency without relocation
    pub fn close(&mut self, status: PendencyStatus, now: DateTime<Utc>) -> Result<()> {
        if self.status != PendencyStatus::Pending || status == PendencyStatus::Pending {
            return Err(SecretaryBotError::InvalidStateTransition {
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        for candidate in self.candidates.iter_mut() {
            if candidate.response == CandidateResponse::Awaiting {
                candidate.response = CandidateResponse::Superseded;
            }
        }
        self.status = status;
        self.updated_at = now;
        Ok(())
    }
}
