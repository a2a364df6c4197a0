//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{SecretaryBotError, Result};
use super::{Settings, StorageBackend};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_bot_config(&settings.bot)?;
    if settings.storage.backend == StorageBackend::Postgres {
        validate_database_config(&settings.database)?;
    }
    validate_redis_config(&settings.redis)?;
    validate_scheduling_config(&settings.scheduling)?;
    validate_recurrence_config(&settings.recurrence)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate bot configuration
fn validate_bot_config(config: &super::BotConfig) -> Result<()> {
    if config.token.is_empty() {
        return Err(SecretaryBotError::Config(
            "Bot token is required".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(SecretaryBotError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(SecretaryBotError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(SecretaryBotError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(SecretaryBotError::Config(
            "Redis URL is required".to_string()
        ));
    }

    if config.ttl_seconds == 0 {
        return Err(SecretaryBotError::Config(
            "Session TTL must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate scheduling engine configuration
pub fn validate_scheduling_config(config: &super::SchedulingConfig) -> Result<()> {
    config.tz()?;

    if config.opening_time >= config.closing_time {
        return Err(SecretaryBotError::Config(
            "Opening time must be before closing time".to_string()
        ));
    }

    if config.grid_minutes == 0 || 60 % config.grid_minutes != 0 {
        return Err(SecretaryBotError::Config(
            format!("Grid of {} minutes must divide an hour", config.grid_minutes)
        ));
    }

    if config.max_suggestions == 0 {
        return Err(SecretaryBotError::Config(
            "At least one suggestion must be requested".to_string()
        ));
    }

    if config.fit_in_search_days == 0 || config.fit_in_max_candidates == 0 {
        return Err(SecretaryBotError::Config(
            "Fit-in search needs at least one day and one candidate".to_string()
        ));
    }

    if config.pendency_ttl_hours <= 0 {
        return Err(SecretaryBotError::Config(
            "Pendency TTL must be positive".to_string()
        ));
    }

    if let Some((service, _)) = config.duration_overrides.iter().find(|(_, minutes)| **minutes == 0) {
        return Err(SecretaryBotError::Config(
            format!("Duration override for {} must be greater than 0", service)
        ));
    }

    Ok(())
}

/// Validate recurrence configuration
fn validate_recurrence_config(config: &super::RecurrenceConfig) -> Result<()> {
    if config.min_cadence_days <= 0 || config.min_cadence_days > config.max_cadence_days {
        return Err(SecretaryBotError::Config(
            "Cadence bounds must satisfy 0 < min <= max".to_string()
        ));
    }

    if config.min_history < 3 {
        return Err(SecretaryBotError::Config(
            "Cadence detection needs at least 3 bookings".to_string()
        ));
    }

    if config.run_interval_hours == 0 {
        return Err(SecretaryBotError::Config(
            "Recurrence run interval must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(SecretaryBotError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(SecretaryBotError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
