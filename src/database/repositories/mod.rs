//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod event;
pub mod professional;
pub mod profile;
pub mod pendency;
pub mod reminder;

// Re-export repositories
pub use event::EventRepository;
pub use professional::ProfessionalRepository;
pub use profile::ProfileRepository;
pub use pendency::PendencyRepository;
pub use reminder::ReminderRepository;
