//! Database module
//!
//! Storage traits, the PostgreSQL repositories implementing them and the
//! in-memory store used by tests and the `memory` backend.

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{create_pool, health_check, run_migrations, DatabasePool};
pub use memory::InMemoryStore;
pub use repositories::{
    EventRepository, PendencyRepository, ProfessionalRepository, ProfileRepository, ReminderRepository,
};
pub use service::DatabaseService;
pub use store::{
    EventStore, PendencyStore, ProfessionalStore, ProfileStore, RelocationWrite, ReminderStore, SaveOutcome,
};
