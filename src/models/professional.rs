//! Professional model

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::helpers::{normalize_name, same_name};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Professional {
    pub business_id: i64,
    pub name: String,
    pub services: Vec<String>,
    #[sqlx(json)]
    pub prices: HashMap<String, f64>,
    /// Service duration overrides in minutes, specific to this professional
    #[sqlx(json)]
    pub durations: HashMap<String, u32>,
}

impl Professional {
    pub fn new(business_id: i64, name: &str, services: &[&str]) -> Self {
        Self {
            business_id,
            name: name.to_string(),
            services: services.iter().map(|s| s.to_string()).collect(),
            prices: HashMap::new(),
            durations: HashMap::new(),
        }
    }

    pub fn with_duration(mut self, service: &str, minutes: u32) -> Self {
        self.durations.insert(service.to_string(), minutes);
        self
    }

    pub fn performs(&self, service: &str) -> bool {
        self.services.iter().any(|s| same_name(s, service))
    }

    pub fn duration_for(&self, service: &str) -> Option<u32> {
        let key = normalize_name(service);
        self.durations
            .iter()
            .find(|(name, _)| normalize_name(name) == key)
            .map(|(_, minutes)| *minutes)
    }

    pub fn price_for(&self, service: &str) -> Option<f64> {
        let key = normalize_name(service);
        self.prices
            .iter()
            .find(|(name, _)| normalize_name(name) == key)
            .map(|(_, price)| *price)
    }

    pub fn is_named(&self, name: &str) -> bool {
        same_name(&self.name, name)
    }
}
