//! User profile model
//!
//! Owners and their clients share one logical store; the profile decides
//! which business a caller's bookings belong to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::errors::{Result, SecretaryBotError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub user_id: i64,
    #[sqlx(try_from = "String")]
    pub user_type: UserType,
    #[sqlx(try_from = "String")]
    pub usage_mode: UsageMode,
    /// Business this user is a client of
    pub owner_id: Option<i64>,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Owner,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageMode {
    Personal,
    Business,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Owner => "owner",
            UserType::Client => "client",
        }
    }
}

impl UsageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageMode::Personal => "personal",
            UsageMode::Business => "business",
        }
    }
}

impl TryFrom<String> for UserType {
    type Error = SecretaryBotError;

    fn try_from(value: String) -> Result<Self> {
        match value.as_str() {
            "owner" => Ok(UserType::Owner),
            "client" => Ok(UserType::Client),
            other => Err(SecretaryBotError::InvalidInput(format!("Unknown user type: {}", other))),
        }
    }
}

impl TryFrom<String> for UsageMode {
    type Error = SecretaryBotError;

    fn try_from(value: String) -> Result<Self> {
        match value.as_str() {
            "personal" => Ok(UsageMode::Personal),
            "business" => Ok(UsageMode::Business),
            other => Err(SecretaryBotError::InvalidInput(format!("Unknown usage mode: {}", other))),
        }
    }
}

impl UserProfile {
    pub fn owner(user_id: i64, usage_mode: UsageMode) -> Self {
        Self {
            user_id,
            user_type: UserType::Owner,
            usage_mode,
            owner_id: None,
            display_name: None,
            created_at: Utc::now(),
        }
    }

    pub fn client_of(user_id: i64, owner_id: i64) -> Self {
        Self {
            user_id,
            user_type: UserType::Client,
            usage_mode: UsageMode::Business,
            owner_id: Some(owner_id),
            display_name: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    /// Business whose calendar this user's bookings live in
    pub fn effective_business_id(&self) -> i64 {
        match (self.user_type, self.owner_id) {
            (UserType::Client, Some(owner_id)) => owner_id,
            _ => self.user_id,
        }
    }

    pub fn is_owner(&self) -> bool {
        self.user_type == UserType::Owner
    }
}
