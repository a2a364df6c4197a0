//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod event;
pub mod professional;
pub mod profile;
pub mod pendency;
pub mod reminder;

// Re-export commonly used models
pub use event::{Event, EventStatus, NewEvent, ConflictingInterval};
pub use professional::Professional;
pub use profile::{UserProfile, UserType, UsageMode};
pub use pendency::{FitInPendency, PendencyStatus, RelocationCandidate, CandidateResponse, AlternativeSlot};
pub use reminder::{Reminder, CreateReminderRequest};
