//! Test helpers module
//!
//! Builds a complete application over the in-memory store, a recording
//! messenger and in-memory sessions, plus fixtures for the scenario tests.

#![allow(dead_code)]

pub mod test_data;

pub use test_data::*;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;
use SecretaryBot::config::{Settings, StorageBackend};
use SecretaryBot::database::{
    DatabaseService, EventStore, InMemoryStore, ProfessionalStore, RelocationWrite, SaveOutcome,
};
use SecretaryBot::models::{Event, EventStatus, NewEvent, Professional};
use SecretaryBot::Result;
use SecretaryBot::scheduling::{RequestContext, SchedulingEngine};
use SecretaryBot::services::RecordingMessenger;
use SecretaryBot::state::{AppContext, InMemorySessionStore};

pub const OWNER_ID: i64 = 1;
pub const REQUESTER_ID: i64 = 200;
pub const CLIENT_X: i64 = 300;
pub const CLIENT_Y: i64 = 400;

/// Everything a test needs, wired the way `main` wires it
pub struct TestApp {
    pub store: InMemoryStore,
    pub racing: Arc<RacingEventStore>,
    pub messenger: RecordingMessenger,
    pub app: AppContext,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(test_settings()).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let _ = tracing_subscriber::fmt::try_init();

        let store = InMemoryStore::new();
        let messenger = RecordingMessenger::new();
        let racing = Arc::new(RacingEventStore::new(store.clone()));
        let database = DatabaseService {
            events: racing.clone(),
            ..DatabaseService::in_memory(store.clone())
        };
        let engine = SchedulingEngine::new(database.clone(), &settings, Arc::new(messenger.clone()))
            .expect("engine builds from test settings");
        let app = AppContext::new(settings, database, engine, Arc::new(InMemorySessionStore::new()));

        let test_app = Self {
            store,
            racing,
            messenger,
            app,
        };
        test_app.seed_profiles().await;
        test_app
    }

    async fn seed_profiles(&self) {
        let db = &self.app.database;
        db.initialize_profile(OWNER_ID, Some("Salão da Ana")).await.expect("owner profile");
        for (client, name) in [(REQUESTER_ID, "Renata"), (CLIENT_X, "Xênia"), (CLIENT_Y, "Yara")] {
            db.register_client(client, OWNER_ID, Some(name)).await.expect("client profile");
        }
    }

    pub fn engine(&self) -> &SchedulingEngine {
        &self.app.engine
    }

    pub async fn add_professional(&self, professional: Professional) {
        self.store.upsert_professional(&professional).await.expect("professional saved");
    }

    /// Insert an event directly, bypassing conflict checks
    pub async fn seed_event(&self, event: Event) -> Event {
        self.store.insert_event(&event).await.expect("event saved");
        event
    }

    pub async fn ctx(&self, caller_id: i64, now: DateTime<Utc>) -> RequestContext {
        self.engine().context_for(caller_id, now).await.expect("context resolves")
    }
}

/// Event store that lets a competing booking land between the engine's conflict
/// check and one of its conditional inserts
pub struct RacingEventStore {
    inner: InMemoryStore,
    armed: Mutex<Option<(usize, Event)>>,
}

impl RacingEventStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            armed: Mutex::new(None),
        }
    }

    /// Store `rival` right before the conditional insert that follows `skip` others
    pub fn arm(&self, skip: usize, rival: Event) {
        *self.armed.lock().unwrap() = Some((skip, rival));
    }

    fn take_rival(&self) -> Option<Event> {
        let mut armed = self.armed.lock().unwrap();
        match armed.take() {
            Some((0, rival)) => Some(rival),
            Some((skip, rival)) => {
                *armed = Some((skip - 1, rival));
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl EventStore for RacingEventStore {
    async fn list_events(&self, business_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Vec<Event>> {
        self.inner.list_events(business_id, from, to).await
    }

    async fn list_client_events(&self, business_id: i64, client_id: i64) -> Result<Vec<Event>> {
        self.inner.list_client_events(business_id, client_id).await
    }

    async fn get_event(&self, business_id: i64, event_id: Uuid) -> Result<Option<Event>> {
        self.inner.get_event(business_id, event_id).await
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        self.inner.insert_event(event).await
    }

    async fn insert_event_if_free(&self, event: &Event) -> Result<SaveOutcome> {
        if let Some(rival) = self.take_rival() {
            self.inner.insert_event(&rival).await?;
        }
        self.inner.insert_event_if_free(event).await
    }

    async fn update_event_status(&self, business_id: i64, event_id: Uuid, status: EventStatus) -> Result<bool> {
        self.inner.update_event_status(business_id, event_id, status).await
    }

    async fn apply_relocation(&self, write: &RelocationWrite) -> Result<SaveOutcome> {
        self.inner.apply_relocation(write).await
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.bot.token = "123456:TEST".to_string();
    settings.storage.backend = StorageBackend::Memory;
    settings
}

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn utc(y: i32, m: u32, day: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, day, h, min, 0).unwrap()
}

/// An event of the test business
pub fn event(
    description: &str,
    date: NaiveDate,
    start: NaiveTime,
    minutes: u32,
    professional: Option<&str>,
    client_id: Option<i64>,
) -> Event {
    NewEvent {
        description: description.to_string(),
        services: vec![description.to_string()],
        date,
        start_time: start,
        duration_minutes: minutes,
        professional: professional.map(str::to_string),
        client_id,
        status: EventStatus::Confirmed,
    }
    .into_event(OWNER_ID, utc(2025, 1, 1, 12, 0))
    .unwrap()
}
