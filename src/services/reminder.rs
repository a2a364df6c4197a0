//! Reminder scheduling
//!
//! Persists a reminder with its UTC firing instant. Dispatching due reminders
//! is left to a separate poller.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use tracing::info;
use uuid::Uuid;

use crate::database::ReminderStore;
use crate::models::{CreateReminderRequest, Reminder};
use crate::utils::errors::{Result, SecretaryBotError};
use crate::utils::helpers::local_to_utc;

#[async_trait]
pub trait ReminderScheduler: Send + Sync {
    async fn schedule_reminder(&self, request: CreateReminderRequest) -> Result<Reminder>;
}

#[derive(Clone)]
pub struct ReminderService {
    store: Arc<dyn ReminderStore>,
    tz: Tz,
}

impl ReminderService {
    pub fn new(store: Arc<dyn ReminderStore>, tz: Tz) -> Self {
        Self { store, tz }
    }

    fn build(&self, request: CreateReminderRequest) -> Result<Reminder> {
        if request.description.trim().is_empty() {
            return Err(SecretaryBotError::InvalidInput("Reminder description is empty".to_string()));
        }
        let starts_at = local_to_utc(self.tz, request.date, request.time)?;
        let minutes_before = i32::try_from(request.minutes_before)
            .map_err(|_| SecretaryBotError::InvalidInput("Reminder lead time is too large".to_string()))?;

        Ok(Reminder {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            description: request.description,
            date: request.date,
            time: request.time,
            minutes_before,
            fire_at: starts_at - Duration::minutes(i64::from(minutes_before)),
            sent: false,
            created_at: Utc::now(),
        })
    }
}

#[async_trait]
impl ReminderScheduler for ReminderService {
    async fn schedule_reminder(&self, request: CreateReminderRequest) -> Result<Reminder> {
        let reminder = self.build(request)?;
        self.store.insert_reminder(&reminder).await?;
        info!(
            reminder_id = %reminder.id,
            user_id = reminder.user_id,
            fire_at = %reminder.fire_at,
            "Reminder scheduled"
        );
        Ok(reminder)
    }
}
