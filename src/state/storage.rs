//! Session storage
//!
//! Redis-backed persistence of `SessionContext` with a TTL per key, plus an
//! in-memory store with the same expiry rules for tests and local runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::context::SessionContext;
use crate::config::RedisConfig;
use crate::utils::errors::Result;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_session(&self, session: &SessionContext) -> Result<()>;

    /// Returns `None` for missing sessions and sessions expired at `now`
    async fn load_session(&self, user_id: i64, now: DateTime<Utc>) -> Result<Option<SessionContext>>;

    async fn delete_session(&self, user_id: i64) -> Result<()>;
}

/// Redis-based state storage manager
#[derive(Clone)]
pub struct StateStorage {
    connection_manager: redis::aio::ConnectionManager,
    config: RedisConfig,
}

impl StateStorage {
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let connection_manager = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            connection_manager,
            config,
        })
    }

    fn session_key(&self, user_id: i64) -> String {
        format!("{}session:{}", self.config.prefix, user_id)
    }

    /// Test Redis connection
    pub async fn test_connection(&self) -> Result<()> {
        let mut conn = self.connection_manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

impl std::fmt::Debug for StateStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStorage")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionStore for StateStorage {
    async fn save_session(&self, session: &SessionContext) -> Result<()> {
        let key = self.session_key(session.user_id);
        let serialized = serde_json::to_string(session)?;
        let ttl_seconds = session.remaining_seconds(session.updated_at).clamp(1, self.config.ttl_seconds.max(1));

        let mut conn = self.connection_manager.clone();
        if let Err(e) = conn.set_ex::<_, _, ()>(&key, serialized, ttl_seconds).await {
            error!(user_id = session.user_id, error = %e, "Failed to save session to Redis");
            return Err(e.into());
        }
        debug!(user_id = session.user_id, ttl_seconds, "Session saved");
        Ok(())
    }

    async fn load_session(&self, user_id: i64, now: DateTime<Utc>) -> Result<Option<SessionContext>> {
        let key = self.session_key(user_id);
        let mut conn = self.connection_manager.clone();

        let Some(data) = conn.get::<_, Option<String>>(&key).await? else {
            return Ok(None);
        };
        let session: SessionContext = serde_json::from_str(&data)?;
        if session.is_expired(now) {
            warn!(user_id, "Session has expired, removing");
            self.delete_session(user_id).await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn delete_session(&self, user_id: i64) -> Result<()> {
        let key = self.session_key(user_id);
        let mut conn = self.connection_manager.clone();
        let deleted: u32 = conn.del(&key).await?;
        debug!(user_id, deleted, "Session deleted");
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<i64, SessionContext>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save_session(&self, session: &SessionContext) -> Result<()> {
        self.sessions.write().await.insert(session.user_id, session.clone());
        Ok(())
    }

    async fn load_session(&self, user_id: i64, now: DateTime<Utc>) -> Result<Option<SessionContext>> {
        let mut sessions = self.sessions.write().await;
        if sessions.get(&user_id).is_some_and(|s| s.is_expired(now)) {
            sessions.remove(&user_id);
            return Ok(None);
        }
        Ok(sessions.get(&user_id).cloned())
    }

    async fn delete_session(&self, user_id: i64) -> Result<()> {
        self.sessions.write().await.remove(&user_id);
        Ok(())
    }
}
