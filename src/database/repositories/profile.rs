//! User profile repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::store::ProfileStore;
use crate::models::profile::UserProfile;
use crate::utils::errors::SecretaryBotError;

#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>, SecretaryBotError> {
        let profile = sqlx::query_as::<_, UserProfile>(
            "SELECT user_id, user_type, usage_mode, owner_id, display_name, created_at FROM user_profiles WHERE user_id = $1"
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), SecretaryBotError> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, user_type, usage_mode, owner_id, display_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE
            SET user_type = EXCLUDED.user_type,
                usage_mode = EXCLUDED.usage_mode,
                owner_id = EXCLUDED.owner_id,
                display_name = COALESCE(EXCLUDED.display_name, user_profiles.display_name)
            "#
        )
        .bind(profile.user_id)
        .bind(profile.user_type.as_str())
        .bind(profile.usage_mode.as_str())
        .bind(profile.owner_id)
        .bind(&profile.display_name)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_business_owner_ids(&self) -> Result<Vec<i64>, SecretaryBotError> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            "SELECT user_id FROM user_profiles WHERE user_type = 'owner' AND usage_mode = 'business' ORDER BY user_id ASC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}
