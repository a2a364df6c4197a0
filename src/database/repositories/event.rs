//! Event repository implementation

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::store::{EventStore, RelocationWrite, SaveOutcome};
use crate::models::event::{Event, EventStatus};
use crate::scheduling::availability::find_conflicts;
use crate::utils::errors::SecretaryBotError;
use crate::utils::helpers::normalize_name;

const EVENT_COLUMNS: &str = "id, business_id, description, services, date, start_time, end_time, professional, client_id, status, created_at, updated_at";

#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Serialize writers on one professional's day until the transaction ends
    async fn lock_professional_day(
        tx: &mut Transaction<'_, Postgres>,
        business_id: i64,
        professional: &str,
        date: NaiveDate,
    ) -> Result<(), SecretaryBotError> {
        let key = format!("{}:{}:{}", business_id, normalize_name(professional), date);
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(key)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn active_events_on(
        tx: &mut Transaction<'_, Postgres>,
        business_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<Event>, SecretaryBotError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE business_id = $1 AND date = $2 AND status <> 'cancelled' AND professional IS NOT NULL",
            EVENT_COLUMNS
        ))
        .bind(business_id)
        .bind(date)
        .fetch_all(&mut **tx)
        .await?;

        Ok(events)
    }

    async fn insert_in(tx: &mut Transaction<'_, Postgres>, event: &Event) -> Result<(), SecretaryBotError> {
        sqlx::query(
            r#"
            INSERT INTO events (id, business_id, description, services, date, start_time, end_time, professional, client_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#
        )
        .bind(event.id)
        .bind(event.business_id)
        .bind(&event.description)
        .bind(&event.services)
        .bind(event.date)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.professional)
        .bind(event.client_id)
        .bind(event.status.as_str())
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl EventStore for EventRepository {
    async fn list_events(&self, business_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Vec<Event>, SecretaryBotError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE business_id = $1 AND date BETWEEN $2 AND $3 ORDER BY date ASC, start_time ASC",
            EVENT_COLUMNS
        ))
        .bind(business_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn list_client_events(&self, business_id: i64, client_id: i64) -> Result<Vec<Event>, SecretaryBotError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE business_id = $1 AND client_id = $2 ORDER BY date ASC, start_time ASC",
            EVENT_COLUMNS
        ))
        .bind(business_id)
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn get_event(&self, business_id: i64, event_id: Uuid) -> Result<Option<Event>, SecretaryBotError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE business_id = $1 AND id = $2",
            EVENT_COLUMNS
        ))
        .bind(business_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn insert_event(&self, event: &Event) -> Result<(), SecretaryBotError> {
        let mut tx = self.pool.begin().await?;
        Self::insert_in(&mut tx, event).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_event_if_free(&self, event: &Event) -> Result<SaveOutcome, SecretaryBotError> {
        let mut tx = self.pool.begin().await?;

        if let Some(professional) = &event.professional {
            Self::lock_professional_day(&mut tx, event.business_id, professional, event.date).await?;
            let existing = Self::active_events_on(&mut tx, event.business_id, event.date).await?;
            let conflicts = find_conflicts(&existing, event.date, event.time_range(), professional, &[]);
            if !conflicts.is_empty() {
                tx.rollback().await?;
                return Ok(SaveOutcome::Conflict(conflicts));
            }
        }

        Self::insert_in(&mut tx, event).await?;
        tx.commit().await?;
        Ok(SaveOutcome::Saved)
    }

    async fn update_event_status(&self, business_id: i64, event_id: Uuid, status: EventStatus) -> Result<bool, SecretaryBotError> {
        let result = sqlx::query(
            "UPDATE events SET status = $3, updated_at = $4 WHERE business_id = $1 AND id = $2"
        )
        .bind(business_id)
        .bind(event_id)
        .bind(status.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_relocation(&self, write: &RelocationWrite) -> Result<SaveOutcome, SecretaryBotError> {
        let mut tx = self.pool.begin().await?;

        // Lock keys in a fixed order so two relocations cannot deadlock
        let mut lock_keys: Vec<(String, NaiveDate)> = [&write.relocated, &write.fit_in]
            .iter()
            .filter_map(|e| e.professional.clone().map(|p| (p, e.date)))
            .collect();
        lock_keys.sort_by(|a, b| (normalize_name(&a.0), a.1).cmp(&(normalize_name(&b.0), b.1)));
        lock_keys.dedup_by(|a, b| normalize_name(&a.0) == normalize_name(&b.0) && a.1 == b.1);
        for (professional, date) in &lock_keys {
            Self::lock_professional_day(&mut tx, write.business_id, professional, *date).await?;
        }

        // Row lock on the pendency; a second acceptance finds it closed
        let concluded = sqlx::query(
            r#"
            UPDATE fit_in_pendencies
            SET candidates = $3,
                status = $4,
                updated_at = $5
            WHERE business_id = $1 AND id = $2 AND status = 'pending'
            "#
        )
        .bind(write.business_id)
        .bind(write.pendency.id)
        .bind(Json(&write.pendency.candidates))
        .bind(write.pendency.status.as_str())
        .bind(write.pendency.updated_at)
        .execute(&mut *tx)
        .await?;
        if concluded.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(SaveOutcome::Missing);
        }

        let cancelled = sqlx::query(
            "UPDATE events SET status = 'cancelled', updated_at = $3 WHERE business_id = $1 AND id = $2 AND status <> 'cancelled'"
        )
        .bind(write.business_id)
        .bind(write.original_event_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        if cancelled.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(SaveOutcome::Missing);
        }

        let mut conflicts = Vec::new();
        if let Some(professional) = &write.relocated.professional {
            let (date, range) = (write.relocated.date, write.relocated.time_range());
            let existing = Self::active_events_on(&mut tx, write.business_id, date).await?;
            conflicts.extend(find_conflicts(&existing, date, range, professional, &[write.original_event_id]));
            conflicts.extend(find_conflicts(std::slice::from_ref(&write.fit_in), date, range, professional, &[]));
        }
        if let Some(professional) = &write.fit_in.professional {
            let (date, range) = (write.fit_in.date, write.fit_in.time_range());
            let existing = Self::active_events_on(&mut tx, write.business_id, date).await?;
            conflicts.extend(find_conflicts(&existing, date, range, professional, &write.fit_in_exclusions()));
        }
        if !conflicts.is_empty() {
            tx.rollback().await?;
            return Ok(SaveOutcome::Conflict(conflicts));
        }

        Self::insert_in(&mut tx, &write.relocated).await?;
        Self::insert_in(&mut tx, &write.fit_in).await?;
        tx.commit().await?;
        Ok(SaveOutcome::Saved)
    }
}
