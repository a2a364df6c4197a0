//! In-memory store
//!
//! Implements every storage trait over a single `RwLock`-guarded state. Holding
//! the write lock across check and insert gives the same atomicity as the
//! PostgreSQL transactions. Used by the `memory` storage backend and by tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::database::store::{
    EventStore, PendencyStore, ProfessionalStore, ProfileStore, ReminderStore, RelocationWrite, SaveOutcome,
};
use crate::models::{Event, EventStatus, FitInPendency, PendencyStatus, Professional, Reminder, UserProfile};
use crate::scheduling::availability::find_conflicts;
use crate::utils::errors::{Result, SecretaryBotError};

#[derive(Debug, Default)]
struct MemoryState {
    events: Vec<Event>,
    professionals: Vec<Professional>,
    profiles: HashMap<i64, UserProfile>,
    pendencies: Vec<FitInPendency>,
    reminders: Vec<Reminder>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail as if the backing store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SecretaryBotError::StoreUnavailable("in-memory store marked unavailable".to_string()));
        }
        Ok(())
    }

    pub async fn all_events(&self) -> Vec<Event> {
        self.state.read().await.events.clone()
    }

    pub async fn all_pendencies(&self) -> Vec<FitInPendency> {
        self.state.read().await.pendencies.clone()
    }

    pub async fn all_reminders(&self) -> Vec<Reminder> {
        self.state.read().await.reminders.clone()
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn list_events(&self, business_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Vec<Event>> {
        self.check_available()?;
        let state = self.state.read().await;
        let mut events: Vec<Event> = state
            .events
            .iter()
            .filter(|e| e.business_id == business_id && e.date >= from && e.date <= to)
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.date, e.start_time));
        Ok(events)
    }

    async fn list_client_events(&self, business_id: i64, client_id: i64) -> Result<Vec<Event>> {
        self.check_available()?;
        let state = self.state.read().await;
        let mut events: Vec<Event> = state
            .events
            .iter()
            .filter(|e| e.business_id == business_id && e.client_id == Some(client_id))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.date, e.start_time));
        Ok(events)
    }

    async fn get_event(&self, business_id: i64, event_id: Uuid) -> Result<Option<Event>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .find(|e| e.business_id == business_id && e.id == event_id)
            .cloned())
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state.events.push(event.clone());
        debug!(event_id = %event.id, business_id = event.business_id, "Event stored in memory");
        Ok(())
    }

    async fn insert_event_if_free(&self, event: &Event) -> Result<SaveOutcome> {
        self.check_available()?;
        let mut state = self.state.write().await;

        if let Some(professional) = &event.professional {
            let same_business: Vec<Event> = state
                .events
                .iter()
                .filter(|e| e.business_id == event.business_id)
                .cloned()
                .collect();
            let conflicts = find_conflicts(&same_business, event.date, event.time_range(), professional, &[]);
            if !conflicts.is_empty() {
                return Ok(SaveOutcome::Conflict(conflicts));
            }
        }

        state.events.push(event.clone());
        Ok(SaveOutcome::Saved)
    }

    async fn update_event_status(&self, business_id: i64, event_id: Uuid, status: EventStatus) -> Result<bool> {
        self.check_available()?;
        let mut state = self.state.write().await;
        match state
            .events
            .iter_mut()
            .find(|e| e.business_id == business_id && e.id == event_id)
        {
            Some(event) => {
                event.status = status;
                event.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn apply_relocation(&self, write: &RelocationWrite) -> Result<SaveOutcome> {
        self.check_available()?;
        let mut state = self.state.write().await;

        let original_active = state
            .events
            .iter()
            .any(|e| e.business_id == write.business_id && e.id == write.original_event_id && e.is_active());
        let pendency_open = state
            .pendencies
            .iter()
            .any(|p| p.id == write.pendency.id && p.status == PendencyStatus::Pending);
        if !original_active || !pendency_open {
            return Ok(SaveOutcome::Missing);
        }

        let same_business: Vec<Event> = state
            .events
            .iter()
            .filter(|e| e.business_id == write.business_id)
            .cloned()
            .collect();
        let mut conflicts = Vec::new();
        if let Some(professional) = &write.relocated.professional {
            let range = write.relocated.time_range();
            let date = write.relocated.date;
            conflicts.extend(find_conflicts(&same_business, date, range, professional, &[write.original_event_id]));
            conflicts.extend(find_conflicts(std::slice::from_ref(&write.fit_in), date, range, professional, &[]));
        }
        if let Some(professional) = &write.fit_in.professional {
            conflicts.extend(find_conflicts(
                &same_business,
                write.fit_in.date,
                write.fit_in.time_range(),
                professional,
                &write.fit_in_exclusions(),
            ));
        }
        if !conflicts.is_empty() {
            return Ok(SaveOutcome::Conflict(conflicts));
        }

        let now = Utc::now();
        if let Some(original) = state.events.iter_mut().find(|e| e.id == write.original_event_id) {
            original.status = EventStatus::Cancelled;
            original.updated_at = now;
        }
        state.events.push(write.relocated.clone());
        state.events.push(write.fit_in.clone());
        if let Some(pendency) = state.pendencies.iter_mut().find(|p| p.id == write.pendency.id) {
            *pendency = write.pendency.clone();
        }
        debug!(pendency_id = %write.pendency.id, "Relocation applied in memory");
        Ok(SaveOutcome::Saved)
    }
}

#[async_trait]
impl ProfessionalStore for InMemoryStore {
    async fn list_professionals(&self, business_id: i64) -> Result<Vec<Professional>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .professionals
            .iter()
            .filter(|p| p.business_id == business_id)
            .cloned()
            .collect())
    }

    async fn upsert_professional(&self, professional: &Professional) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state
            .professionals
            .retain(|p| !(p.business_id == professional.business_id && p.is_named(&professional.name)));
        state.professionals.push(professional.clone());
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>> {
        self.check_available()?;
        Ok(self.state.read().await.profiles.get(&user_id).cloned())
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        self.check_available()?;
        self.state.write().await.profiles.insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn list_business_owner_ids(&self) -> Result<Vec<i64>> {
        self.check_available()?;
        let state = self.state.read().await;
        let mut ids: Vec<i64> = state
            .profiles
            .values()
            .filter(|p| p.is_owner() && p.usage_mode == crate::models::UsageMode::Business)
            .map(|p| p.user_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[async_trait]
impl PendencyStore for InMemoryStore {
    async fn insert_pendency(&self, pendency: &FitInPendency) -> Result<()> {
        self.check_available()?;
        self.state.write().await.pendencies.push(pendency.clone());
        Ok(())
    }

    async fn update_pendency(&self, pendency: &FitInPendency) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        match state.pendencies.iter_mut().find(|p| p.id == pendency.id) {
            Some(existing) => {
                *existing = pendency.clone();
                Ok(())
            }
            None => Err(SecretaryBotError::InvalidInput(format!("Unknown pendency {}", pendency.id))),
        }
    }

    async fn latest_pending_for_client(&self, business_id: i64, client_id: i64) -> Result<Option<FitInPendency>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .pendencies
            .iter()
            .filter(|p| p.business_id == business_id && p.status == PendencyStatus::Pending)
            .filter(|p| p.awaiting_candidate(client_id).is_some())
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn list_expired_pending(&self, now: DateTime<Utc>) -> Result<Vec<FitInPendency>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .pendencies
            .iter()
            .filter(|p| p.status == PendencyStatus::Pending && p.is_expired(now))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReminderStore for InMemoryStore {
    async fn insert_reminder(&self, reminder: &Reminder) -> Result<()> {
        self.check_available()?;
        self.state.write().await.reminders.push(reminder.clone());
        Ok(())
    }
}
