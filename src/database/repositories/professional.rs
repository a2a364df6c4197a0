//! Professional repository implementation

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::database::store::ProfessionalStore;
use crate::models::professional::Professional;
use crate::utils::errors::SecretaryBotError;
use crate::utils::helpers::normalize_name;

#[derive(Clone)]
pub struct ProfessionalRepository {
    pool: PgPool,
}

impl ProfessionalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Remove a professional from a business
    pub async fn delete(&self, business_id: i64, name: &str) -> Result<bool, SecretaryBotError> {
        let result = sqlx::query("DELETE FROM professionals WHERE business_id = $1 AND name_key = $2")
            .bind(business_id)
            .bind(normalize_name(name))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProfessionalStore for ProfessionalRepository {
    async fn list_professionals(&self, business_id: i64) -> Result<Vec<Professional>, SecretaryBotError> {
        let professionals = sqlx::query_as::<_, Professional>(
            "SELECT business_id, name, services, prices, durations FROM professionals WHERE business_id = $1 ORDER BY name ASC"
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(professionals)
    }

    async fn upsert_professional(&self, professional: &Professional) -> Result<(), SecretaryBotError> {
        sqlx::query(
            r#"
            INSERT INTO professionals (business_id, name, name_key, services, prices, durations)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (business_id, name_key) DO UPDATE
            SET name = EXCLUDED.name,
                services = EXCLUDED.services,
                prices = EXCLUDED.prices,
                durations = EXCLUDED.durations
            "#
        )
        .bind(professional.business_id)
        .bind(&professional.name)
        .bind(normalize_name(&professional.name))
        .bind(&professional.services)
        .bind(Json(&professional.prices))
        .bind(Json(&professional.durations))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
