//! Application and session context
//!
//! `AppContext` bundles the long-lived handles every handler needs.
//! `SessionContext` is the short-lived per-user state kept between messages,
//! such as the list of bookings offered for cancellation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Settings;
use crate::database::DatabaseService;
use crate::scheduling::SchedulingEngine;
use crate::state::storage::SessionStore;

/// Application-wide context containing services and settings
#[derive(Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub database: DatabaseService,
    pub engine: SchedulingEngine,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppContext {
    pub fn new(settings: Settings, database: DatabaseService, engine: SchedulingEngine, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            settings,
            database,
            engine,
            sessions,
        }
    }
}

/// What a bare numeric reply from the user refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AwaitingReply {
    /// Events offered for cancellation, in the order they were listed
    CancellationChoice { event_ids: Vec<Uuid> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: i64,
    pub awaiting: AwaitingReply,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(user_id: i64, awaiting: AwaitingReply, now: DateTime<Utc>, ttl_seconds: u64) -> Self {
        let ttl = Duration::seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX / 1000));
        Self {
            user_id,
            awaiting,
            expires_at: now + ttl,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Seconds left before expiry, never negative
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(0) as u64
    }

    /// Event id for a 1-based cancellation choice
    pub fn cancellation_target(&self, option: usize) -> Option<Uuid> {
        match &self.awaiting {
            AwaitingReply::CancellationChoice { event_ids } => {
                option.checked_sub(1).and_then(|i| event_ids.get(i)).copied()
            }
        }
    }
}
