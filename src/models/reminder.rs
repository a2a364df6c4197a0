//! Reminder model

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: i64,
    pub description: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub minutes_before: i32,
    pub fire_at: DateTime<Utc>,
    pub sent: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReminderRequest {
    pub user_id: i64,
    pub description: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub minutes_before: u32,
}
