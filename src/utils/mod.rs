//! Utility modules
//!
//! This module contains common utilities used throughout the application,
//! including error handling, logging setup, time intervals and helper functions.

pub mod errors;
pub mod logging;
pub mod helpers;
pub mod time;

pub use errors::{SecretaryBotError, Result};
pub use time::TimeRange;
