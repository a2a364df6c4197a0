//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the SecretaryBot application.

use chrono::{NaiveDate, NaiveTime};
use tracing::{info, warn, error, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop and must be held by `main`.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "secretarybot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log booking actions with structured data
pub fn log_booking_action(
    business_id: i64,
    action: &str,
    event_id: Option<Uuid>,
    professional: Option<&str>,
    date: NaiveDate,
    time: NaiveTime,
) {
    info!(
        business_id = business_id,
        action = action,
        event_id = ?event_id,
        professional = professional,
        date = %date,
        time = %time,
        "Booking action performed"
    );
}

/// Log conflict decisions
pub fn log_conflict_check(business_id: i64, professional: &str, date: NaiveDate, time: NaiveTime, conflicts: usize) {
    if conflicts > 0 {
        info!(
            business_id = business_id,
            professional = professional,
            date = %date,
            time = %time,
            conflicts = conflicts,
            "Slot is occupied"
        );
    } else {
        debug!(
            business_id = business_id,
            professional = professional,
            date = %date,
            time = %time,
            "Slot is free"
        );
    }
}

/// Log fit-in pendency transitions
pub fn log_fit_in_transition(pendency_id: Uuid, business_id: i64, from: &str, to: &str) {
    info!(
        pendency_id = %pendency_id,
        business_id = business_id,
        from = from,
        to = to,
        "Fit-in pendency transition"
    );
}

/// Log store failures with context
pub fn log_store_failure(operation: &str, business_id: i64, error: &str) {
    error!(
        operation = operation,
        business_id = business_id,
        error = error,
        "Store operation failed"
    );
}

/// Log outbound message failures
pub fn log_delivery_failure(user_id: i64, error: &str) {
    warn!(
        user_id = user_id,
        error = error,
        "Outbound message could not be delivered"
    );
}
