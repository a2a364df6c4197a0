//! Event store accessor
//!
//! Business-scoped reads and writes over the storage traits. Store failures
//! are logged here and returned as errors; they never read as an empty agenda.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::database::{DatabaseService, RelocationWrite, SaveOutcome};
use crate::models::{Event, EventStatus, Professional};
use crate::utils::errors::{Result, SecretaryBotError};
use crate::utils::logging::log_store_failure;

#[derive(Clone)]
pub struct EventStoreAccessor {
    db: DatabaseService,
}

fn logged<T>(operation: &str, business_id: i64, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        log_store_failure(operation, business_id, &e.to_string());
    }
    result
}

impl EventStoreAccessor {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &DatabaseService {
        &self.db
    }

    /// Own id for owners and unknown users, the owner's id for linked clients
    pub async fn get_effective_business_id(&self, caller_id: i64) -> Result<i64> {
        let profile = logged("get_profile", caller_id, self.db.profiles.get_profile(caller_id).await)?;
        Ok(profile.map_or(caller_id, |p| p.effective_business_id()))
    }

    /// Non-cancelled events with `from <= date <= to`
    pub async fn list_events(&self, business_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Vec<Event>> {
        let events = self.list_all_events(business_id, from, to).await?;
        Ok(events.into_iter().filter(Event::is_active).collect())
    }

    /// Every event in the range, cancelled ones included
    pub async fn list_all_events(&self, business_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Vec<Event>> {
        if to < from {
            return Err(SecretaryBotError::InvalidInput(format!("Date range {} - {} is inverted", from, to)));
        }
        logged("list_events", business_id, self.db.events.list_events(business_id, from, to).await)
    }

    pub async fn list_client_events(&self, business_id: i64, client_id: i64) -> Result<Vec<Event>> {
        logged(
            "list_client_events",
            business_id,
            self.db.events.list_client_events(business_id, client_id).await,
        )
    }

    pub async fn get_event(&self, business_id: i64, event_id: Uuid) -> Result<Option<Event>> {
        logged("get_event", business_id, self.db.events.get_event(business_id, event_id).await)
    }

    /// Conditional insert: stored only if the professional's slot is still free
    pub async fn save_event(&self, business_id: i64, event: &Event) -> Result<SaveOutcome> {
        if event.business_id != business_id {
            return Err(SecretaryBotError::PermissionDenied(format!(
                "event belongs to business {}, not {}",
                event.business_id, business_id
            )));
        }
        logged("save_event", business_id, self.db.events.insert_event_if_free(event).await)
    }

    pub async fn update_event_status(&self, business_id: i64, event_id: Uuid, status: EventStatus) -> Result<()> {
        let updated = logged(
            "update_event_status",
            business_id,
            self.db.events.update_event_status(business_id, event_id, status).await,
        )?;
        if !updated {
            return Err(SecretaryBotError::EventNotFound { event_id });
        }
        Ok(())
    }

    /// Soft cancel; the record is kept with status `cancelled`
    pub async fn cancel_event(&self, business_id: i64, event_id: Uuid) -> Result<Event> {
        let mut event = self
            .get_event(business_id, event_id)
            .await?
            .ok_or(SecretaryBotError::EventNotFound { event_id })?;
        if event.status != EventStatus::Cancelled {
            self.update_event_status(business_id, event_id, EventStatus::Cancelled).await?;
            event.status = EventStatus::Cancelled;
            event.updated_at = Utc::now();
        }
        Ok(event)
    }

    pub async fn apply_relocation(&self, write: &RelocationWrite) -> Result<SaveOutcome> {
        logged("apply_relocation", write.business_id, self.db.events.apply_relocation(write).await)
    }

    pub async fn list_professionals(&self, business_id: i64) -> Result<Vec<Professional>> {
        logged(
            "list_professionals",
            business_id,
            self.db.professionals.list_professionals(business_id).await,
        )
    }
}
