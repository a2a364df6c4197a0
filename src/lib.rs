//! SecretaryBot Telegram Bot
//!
//! A virtual secretary that schedules appointments for salons, clinics and
//! other appointment-based businesses. The scheduling engine checks conflicts,
//! suggests free slots, plans split packages across professionals, fits urgent
//! clients in by relocating others, and proposes recurring bookings.

#![allow(non_snake_case)]

pub mod config;
pub mod database;
pub mod handlers;
pub mod models;
pub mod scheduling;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{Result, SecretaryBotError};

// Re-export main components for easy access
pub use database::{DatabaseService, InMemoryStore};
pub use scheduling::{RequestContext, SchedulingEngine};
pub use state::{AppContext, InMemorySessionStore, StateStorage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
