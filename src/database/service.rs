//! Database service layer
//!
//! Bundles one handle per storage trait so the scheduling engine can run
//! against PostgreSQL or the in-memory store without knowing which.

use std::sync::Arc;

use crate::database::{
    DatabasePool, EventRepository, EventStore, InMemoryStore, PendencyRepository, PendencyStore,
    ProfessionalRepository, ProfessionalStore, ProfileRepository, ProfileStore, ReminderRepository,
    ReminderStore,
};
use crate::models::UserProfile;
use crate::utils::errors::SecretaryBotError;

#[derive(Clone)]
pub struct DatabaseService {
    pub events: Arc<dyn EventStore>,
    pub professionals: Arc<dyn ProfessionalStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub pendencies: Arc<dyn PendencyStore>,
    pub reminders: Arc<dyn ReminderStore>,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            events: Arc::new(EventRepository::new(pool.clone())),
            professionals: Arc::new(ProfessionalRepository::new(pool.clone())),
            profiles: Arc::new(ProfileRepository::new(pool.clone())),
            pendencies: Arc::new(PendencyRepository::new(pool.clone())),
            reminders: Arc::new(ReminderRepository::new(pool)),
        }
    }

    /// Every store backed by the same in-memory state
    pub fn in_memory(store: InMemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            events: store.clone(),
            professionals: store.clone(),
            profiles: store.clone(),
            pendencies: store.clone(),
            reminders: store,
        }
    }

    /// Return the user's profile, creating a business owner profile on first contact
    pub async fn initialize_profile(&self, user_id: i64, display_name: Option<&str>) -> Result<UserProfile, SecretaryBotError> {
        if let Some(existing) = self.profiles.get_profile(user_id).await? {
            return Ok(existing);
        }

        let mut profile = UserProfile::owner(user_id, crate::models::UsageMode::Business);
        if let Some(name) = display_name {
            profile = profile.with_display_name(name);
        }
        self.profiles.upsert_profile(&profile).await?;
        tracing::info!(user_id, "Created owner profile");

        Ok(profile)
    }

    /// Attach a client to an owner's business
    pub async fn register_client(&self, client_id: i64, owner_id: i64, display_name: Option<&str>) -> Result<UserProfile, SecretaryBotError> {
        let owner = self
            .profiles
            .get_profile(owner_id)
            .await?
            .ok_or(SecretaryBotError::UserNotFound { user_id: owner_id })?;
        if !owner.is_owner() {
            return Err(SecretaryBotError::InvalidInput(format!("user {} is not a business owner", owner_id)));
        }

        let mut profile = UserProfile::client_of(client_id, owner_id);
        if let Some(name) = display_name {
            profile = profile.with_display_name(name);
        }
        self.profiles.upsert_profile(&profile).await?;

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserType;

    #[tokio::test]
    async fn test_initialize_profile_is_idempotent() {
        let service = DatabaseService::in_memory(InMemoryStore::new());

        let first = service.initialize_profile(10, Some("Ana")).await.unwrap();
        let second = service.initialize_profile(10, None).await.unwrap();

        assert_eq!(first.user_type, UserType::Owner);
        assert_eq!(second.display_name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_register_client_requires_owner() {
        let service = DatabaseService::in_memory(InMemoryStore::new());
        service.initialize_profile(1, None).await.unwrap();

        let client = service.register_client(2, 1, Some("Carla")).await.unwrap();
        assert_eq!(client.effective_business_id(), 1);

        let result = service.register_client(3, 2, None).await;
        assert!(matches!(result, Err(SecretaryBotError::InvalidInput(_))));

        let result = service.register_client(4, 99, None).await;
        assert!(matches!(result, Err(SecretaryBotError::UserNotFound { user_id: 99 })));
    }
}
