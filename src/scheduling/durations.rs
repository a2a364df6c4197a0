//! Service duration resolution
//!
//! One lookup chain used by booking, the split planner, fit-in and the
//! recurrence detector: the professional's own table, then the business
//! overrides from configuration, then the built-in table, then one hour.

use std::collections::HashMap;

use crate::models::Professional;
use crate::utils::helpers::normalize_name;

pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Typical salon service durations, keyed by normalized service name
const BUILTIN_DURATIONS: &[(&str, u32)] = &[
    ("corte", 30),
    ("escova", 40),
    ("hidratacao", 45),
    ("manicure", 30),
    ("pedicure", 40),
    ("coloracao", 90),
    ("progressiva", 120),
    ("barba", 20),
    ("sobrancelha", 20),
    ("maquiagem", 60),
];

#[derive(Debug, Clone, Default)]
pub struct DurationResolver {
    overrides: HashMap<String, u32>,
}

impl DurationResolver {
    pub fn new(overrides: &HashMap<String, u32>) -> Self {
        Self {
            overrides: overrides
                .iter()
                .filter(|(_, minutes)| **minutes > 0)
                .map(|(service, minutes)| (normalize_name(service), *minutes))
                .collect(),
        }
    }

    /// Duration of `service` when performed by `professional`
    pub fn resolve(&self, professional: Option<&Professional>, service: &str) -> u32 {
        professional
            .and_then(|p| p.duration_for(service))
            .filter(|minutes| *minutes > 0)
            .unwrap_or_else(|| self.resolve_default(service))
    }

    /// Duration of `service` ignoring professional-specific tables
    pub fn resolve_default(&self, service: &str) -> u32 {
        let key = normalize_name(service);
        self.overrides
            .get(&key)
            .copied()
            .or_else(|| builtin_duration(&key))
            .unwrap_or(DEFAULT_DURATION_MINUTES)
    }
}

fn builtin_duration(key: &str) -> Option<u32> {
    BUILTIN_DURATIONS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, minutes)| *minutes)
}
