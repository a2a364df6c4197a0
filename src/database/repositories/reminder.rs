//! Reminder repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::store::ReminderStore;
use crate::models::reminder::Reminder;
use crate::utils::errors::SecretaryBotError;

#[derive(Clone)]
pub struct ReminderRepository {
    pool: PgPool,
}

impl ReminderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderStore for ReminderRepository {
    async fn insert_reminder(&self, reminder: &Reminder) -> Result<(), SecretaryBotError> {
        sqlx::query(
            r#"
            INSERT INTO reminders (id, user_id, description, date, time, minutes_before, fire_at, sent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#
        )
        .bind(reminder.id)
        .bind(reminder.user_id)
        .bind(&reminder.description)
        .bind(reminder.date)
        .bind(reminder.time)
        .bind(reminder.minutes_before)
        .bind(reminder.fire_at)
        .bind(reminder.sent)
        .bind(reminder.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
