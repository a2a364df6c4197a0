//! Fit-in pendency repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::database::store::PendencyStore;
use crate::models::pendency::FitInPendency;
use crate::utils::errors::SecretaryBotError;

const PENDENCY_COLUMNS: &str = "id, business_id, requester_id, description, desired_date, desired_time, duration_minutes, professional, candidates, status, created_at, expires_at, updated_at";

#[derive(Clone)]
pub struct PendencyRepository {
    pool: PgPool,
}

impl PendencyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PendencyStore for PendencyRepository {
    async fn insert_pendency(&self, pendency: &FitInPendency) -> Result<(), SecretaryBotError> {
        sqlx::query(
            r#"
            INSERT INTO fit_in_pendencies (id, business_id, requester_id, description, desired_date, desired_time, duration_minutes, professional, candidates, status, created_at, expires_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#
        )
        .bind(pendency.id)
        .bind(pendency.business_id)
        .bind(pendency.requester_id)
        .bind(&pendency.description)
        .bind(pendency.desired_date)
        .bind(pendency.desired_time)
        .bind(pendency.duration_minutes)
        .bind(&pendency.professional)
        .bind(Json(&pendency.candidates))
        .bind(pendency.status.as_str())
        .bind(pendency.created_at)
        .bind(pendency.expires_at)
        .bind(pendency.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_pendency(&self, pendency: &FitInPendency) -> Result<(), SecretaryBotError> {
        sqlx::query(
            r#"
            UPDATE fit_in_pendencies
            SET candidates = $2,
                status = $3,
                updated_at = $4
            WHERE id = $1
            "#
        )
        .bind(pendency.id)
        .bind(Json(&pendency.candidates))
        .bind(pendency.status.as_str())
        .bind(pendency.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_pending_for_client(&self, business_id: i64, client_id: i64) -> Result<Option<FitInPendency>, SecretaryBotError> {
        let filter = serde_json::json!([{ "affected_client_id": client_id, "response": "awaiting" }]);
        let pendency = sqlx::query_as::<_, FitInPendency>(&format!(
            "SELECT {} FROM fit_in_pendencies WHERE business_id = $1 AND status = 'pending' AND candidates @> $2 ORDER BY created_at DESC LIMIT 1",
            PENDENCY_COLUMNS
        ))
        .bind(business_id)
        .bind(filter)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pendency)
    }

    async fn list_expired_pending(&self, now: DateTime<Utc>) -> Result<Vec<FitInPendency>, SecretaryBotError> {
        let pendencies = sqlx::query_as::<_, FitInPendency>(&format!(
            "SELECT {} FROM fit_in_pendencies WHERE status = 'pending' AND expires_at <= $1 ORDER BY created_at ASC",
            PENDENCY_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(pendencies)
    }
}
