//! Storage traits consumed by the scheduling engine
//!
//! Each trait is implemented by a PostgreSQL repository and by the in-memory
//! store. Every method is scoped by the effective business id.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    ConflictingInterval, Event, EventStatus, FitInPendency, Professional, Reminder, UserProfile,
};
use crate::utils::errors::Result;

/// Result of a conditional write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Another active event took the slot between check and write
    Conflict(Vec<ConflictingInterval>),
    /// A record the write depends on no longer exists, was cancelled or was already closed
    Missing,
}

/// Everything an accepted relocation writes, applied together
#[derive(Debug, Clone)]
pub struct RelocationWrite {
    pub business_id: i64,
    pub original_event_id: Uuid,
    pub relocated: Event,
    pub fit_in: Event,
    /// Bookings offered relocation in the same pendency; they stay where they are
    /// and may overlap the fit-in
    pub sibling_event_ids: Vec<Uuid>,
    /// The pendency in its concluded state; written only while the stored one is still pending
    pub pendency: FitInPendency,
}

impl RelocationWrite {
    /// Events ignored when re-checking the fit-in slot
    pub fn fit_in_exclusions(&self) -> Vec<Uuid> {
        let mut excluded = self.sibling_event_ids.clone();
        excluded.push(self.original_event_id);
        excluded
    }
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events (cancelled included) with `from <= date <= to`
    async fn list_events(&self, business_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Vec<Event>>;

    /// All events of one client, cancelled included
    async fn list_client_events(&self, business_id: i64, client_id: i64) -> Result<Vec<Event>>;

    async fn get_event(&self, business_id: i64, event_id: Uuid) -> Result<Option<Event>>;

    /// Unconditional insert
    async fn insert_event(&self, event: &Event) -> Result<()>;

    /// Insert unless an active event of the same professional overlaps it.
    /// The overlap check and the insert happen atomically.
    async fn insert_event_if_free(&self, event: &Event) -> Result<SaveOutcome>;

    /// Returns false when the event does not exist
    async fn update_event_status(&self, business_id: i64, event_id: Uuid, status: EventStatus) -> Result<bool>;

    /// Cancel the original event, insert the relocated and fit-in events and store the
    /// concluded pendency in one transaction. Both target slots are re-checked with the
    /// original excluded; the fit-in slot also ignores the sibling candidates.
    async fn apply_relocation(&self, write: &RelocationWrite) -> Result<SaveOutcome>;
}

#[async_trait]
pub trait ProfessionalStore: Send + Sync {
    async fn list_professionals(&self, business_id: i64) -> Result<Vec<Professional>>;

    async fn upsert_professional(&self, professional: &Professional) -> Result<()>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>>;

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<()>;

    /// Ids of every owner running in business mode
    async fn list_business_owner_ids(&self) -> Result<Vec<i64>>;
}

#[async_trait]
pub trait PendencyStore: Send + Sync {
    async fn insert_pendency(&self, pendency: &FitInPendency) -> Result<()>;

    async fn update_pendency(&self, pendency: &FitInPendency) -> Result<()>;

    /// Most recent `pending` pendency in which `client_id` is an awaiting candidate
    async fn latest_pending_for_client(&self, business_id: i64, client_id: i64) -> Result<Option<FitInPendency>>;

    /// Pending pendencies whose expiry is at or before `now`
    async fn list_expired_pending(&self, now: DateTime<Utc>) -> Result<Vec<FitInPendency>>;
}

#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn insert_reminder(&self, reminder: &Reminder) -> Result<()>;
}
