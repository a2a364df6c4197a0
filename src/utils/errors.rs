//! Error handling for SecretaryBot
//!
//! This module defines the main error type used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for SecretaryBot application
#[derive(Error, Debug)]
pub enum SecretaryBotError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: Uuid },

    #[error("Pendency not found for client {client_id}")]
    PendencyNotFound { client_id: i64 },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Result type alias for SecretaryBot operations
pub type Result<T> = std::result::Result<T, SecretaryBotError>;

impl SecretaryBotError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            SecretaryBotError::Database(_) => false,
            SecretaryBotError::Migration(_) => false,
            SecretaryBotError::Telegram(_) => true,
            SecretaryBotError::Redis(_) => true,
            SecretaryBotError::Config(_) => false,
            SecretaryBotError::ConfigLoad(_) => false,
            SecretaryBotError::PermissionDenied(_) => false,
            SecretaryBotError::UserNotFound { .. } => false,
            SecretaryBotError::EventNotFound { .. } => false,
            SecretaryBotError::PendencyNotFound { .. } => false,
            SecretaryBotError::InvalidStateTransition { .. } => false,
            SecretaryBotError::Serialization(_) => false,
            SecretaryBotError::Io(_) => true,
            SecretaryBotError::InvalidInput(_) => false,
            SecretaryBotError::StoreUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SecretaryBotError::Database(_) => ErrorSeverity::Critical,
            SecretaryBotError::Migration(_) => ErrorSeverity::Critical,
            SecretaryBotError::Config(_) => ErrorSeverity::Critical,
            SecretaryBotError::ConfigLoad(_) => ErrorSeverity::Critical,
            SecretaryBotError::PermissionDenied(_) => ErrorSeverity::Warning,
            SecretaryBotError::PendencyNotFound { .. } => ErrorSeverity::Info,
            SecretaryBotError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Whether the message can be shown to the end user as-is
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            SecretaryBotError::InvalidInput(_)
                | SecretaryBotError::PermissionDenied(_)
                | SecretaryBotError::EventNotFound { .. }
                | SecretaryBotError::PendencyNotFound { .. }
        )
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
