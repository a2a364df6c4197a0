//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use std::collections::HashMap;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::utils::errors::{Result, SecretaryBotError};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub storage: StorageConfig,
    pub scheduling: SchedulingConfig,
    pub recurrence: RecurrenceConfig,
    pub logging: LoggingConfig,
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    pub token: String,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    pub prefix: String,
    pub ttl_seconds: u64,
}

/// Which persistence backend the bot runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// Scheduling engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulingConfig {
    /// IANA timezone all event dates and times are expressed in
    pub timezone: String,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub grid_minutes: u32,
    /// Transition buffer before a package starts and after it ends
    pub package_buffer_minutes: u32,
    pub max_wait_minutes: u32,
    pub max_suggestions: usize,
    pub fit_in_search_days: u32,
    pub fit_in_max_candidates: usize,
    pub pendency_ttl_hours: i64,
    pub reminder_minutes_before: u32,
    /// Per-business service duration overrides, keyed by service name
    pub duration_overrides: HashMap<String, u32>,
}

/// Recurrence detector configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecurrenceConfig {
    pub enabled: bool,
    pub lookback_days: i64,
    pub min_history: usize,
    pub min_cadence_days: i64,
    pub max_cadence_days: i64,
    pub min_days_since_last: i64,
    pub preferred_times: Vec<NaiveTime>,
    pub run_interval_hours: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> std::result::Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("SECRETARY").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        super::validation::validate_settings(self)
    }
}

impl SchedulingConfig {
    /// Parse the configured timezone
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| SecretaryBotError::Config(format!("Invalid timezone {}: {}", self.timezone, e)))
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            timezone: "America/Sao_Paulo".to_string(),
            opening_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            closing_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            grid_minutes: 10,
            package_buffer_minutes: 5,
            max_wait_minutes: 20,
            max_suggestions: 3,
            fit_in_search_days: 5,
            fit_in_max_candidates: 2,
            pendency_ttl_hours: 24,
            reminder_minutes_before: 60,
            duration_overrides: HashMap::new(),
        }
    }
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback_days: 180,
            min_history: 3,
            min_cadence_days: 10,
            max_cadence_days: 35,
            min_days_since_last: 5,
            preferred_times: [10, 14, 16]
                .iter()
                .filter_map(|h| NaiveTime::from_hms_opt(*h, 0, 0))
                .collect(),
            run_interval_hours: 24,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                token: String::new(),
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/secretarybot".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                prefix: "secretarybot:".to_string(),
                ttl_seconds: 900,
            },
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
            },
            scheduling: SchedulingConfig::default(),
            recurrence: RecurrenceConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "/var/log/secretarybot".to_string(),
            },
        }
    }
}
