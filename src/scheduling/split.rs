//! Two-service package planning
//!
//! Places service A then service B back to back, possibly with different
//! professionals. A carries a leading buffer, B a trailing one, and B starts on
//! the grid no more than the configured wait after A ends.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SchedulingConfig;
use crate::models::{Event, Professional};
use crate::scheduling::accessor::EventStoreAccessor;
use crate::scheduling::availability::find_conflicts;
use crate::scheduling::durations::DurationResolver;
use crate::utils::errors::{Result, SecretaryBotError};
use crate::utils::time::{add_minutes, minutes_between, round_up_to_grid, TimeRange};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitLeg {
    pub service: String,
    pub professional: String,
    pub start: NaiveTime,
    pub duration_minutes: u32,
}

impl SplitLeg {
    pub fn range(&self) -> Option<TimeRange> {
        TimeRange::from_duration(self.start, self.duration_minutes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    pub date: NaiveDate,
    pub first: SplitLeg,
    pub second: SplitLeg,
    /// Minutes between the end of the first service and the start of the second
    pub wait_minutes: u32,
}

#[derive(Clone)]
pub struct SplitPlanner {
    accessor: EventStoreAccessor,
    config: SchedulingConfig,
    durations: DurationResolver,
}

/// Capable professionals, the preferred one first and the rest by name
fn candidates_for<'a>(professionals: &'a [Professional], service: &str, preferred: Option<&str>) -> Vec<&'a Professional> {
    let mut capable: Vec<&Professional> = professionals.iter().filter(|p| p.performs(service)).collect();
    capable.sort_by(|a, b| a.name.cmp(&b.name));
    if let Some(preferred) = preferred {
        capable.sort_by_key(|p| !p.is_named(preferred));
    }
    capable
}

impl SplitPlanner {
    pub fn new(accessor: EventStoreAccessor, config: SchedulingConfig, durations: DurationResolver) -> Self {
        Self {
            accessor,
            config,
            durations,
        }
    }

    pub async fn plan_split(
        &self,
        business_id: i64,
        date: NaiveDate,
        desired_start: NaiveTime,
        services: &[String],
        preferred_professional: Option<&str>,
    ) -> Result<Option<SplitPlan>> {
        let services: Vec<&str> = services.iter().map(|s| s.trim()).collect();
        let [service_a, service_b] = services.as_slice() else {
            return Err(SecretaryBotError::InvalidInput("A split booking needs exactly two services".to_string()));
        };
        let (service_a, service_b) = (*service_a, *service_b);
        if service_a.is_empty() || service_b.is_empty() {
            return Err(SecretaryBotError::InvalidInput("Service names cannot be empty".to_string()));
        }

        let professionals = self.accessor.list_professionals(business_id).await?;
        let for_a = candidates_for(&professionals, service_a, preferred_professional);
        let for_b = candidates_for(&professionals, service_b, preferred_professional);
        if for_a.is_empty() || for_b.is_empty() {
            debug!(business_id, service_a, service_b, "No professional performs one of the services");
            return Ok(None);
        }

        let events = self.accessor.list_events(business_id, date, date).await?;
        let grid = self.config.grid_minutes;
        let mut start = desired_start.max(self.config.opening_time);
        if start != desired_start {
            start = round_up_to_grid(start, grid).unwrap_or(start);
        }

        loop {
            for professional_a in &for_a {
                let duration_a = self.durations.resolve(Some(*professional_a), service_a);
                let Some(range_a) = TimeRange::from_duration(start, duration_a) else {
                    continue;
                };
                if range_a.end > self.config.closing_time {
                    continue;
                }
                let buffered_a = range_a.padded(self.config.package_buffer_minutes, 0);
                if !find_conflicts(&events, date, buffered_a, &professional_a.name, &[]).is_empty() {
                    continue;
                }

                let first = SplitLeg {
                    service: service_a.to_string(),
                    professional: professional_a.name.clone(),
                    start,
                    duration_minutes: duration_a,
                };
                if let Some(plan) = self.place_second(&events, date, first, range_a.end, service_b, &for_b) {
                    info!(
                        business_id,
                        date = %date,
                        first = %plan.first.professional,
                        second = %plan.second.professional,
                        wait_minutes = plan.wait_minutes,
                        "Split plan found"
                    );
                    return Ok(Some(plan));
                }
            }

            // An off-grid desired start is tried once, later attempts sit on the grid
            let next = add_minutes(start, 1).and_then(|t| round_up_to_grid(t, grid.max(1)));
            match next {
                Some(next) if next < self.config.closing_time => start = next,
                _ => break,
            }
        }

        Ok(None)
    }

    fn place_second(
        &self,
        events: &[Event],
        date: NaiveDate,
        first: SplitLeg,
        end_a: NaiveTime,
        service_b: &str,
        for_b: &[&Professional],
    ) -> Option<SplitPlan> {
        let grid = self.config.grid_minutes;
        let mut start_b = round_up_to_grid(end_a, grid)?;

        while minutes_between(end_a, start_b) <= i64::from(self.config.max_wait_minutes) {
            for professional_b in for_b {
                let duration_b = self.durations.resolve(Some(*professional_b), service_b);
                let Some(range_b) = TimeRange::from_duration(start_b, duration_b) else {
                    continue;
                };
                if range_b.end > self.config.closing_time {
                    continue;
                }
                let buffered_b = range_b.padded(0, self.config.package_buffer_minutes);
                if find_conflicts(events, date, buffered_b, &professional_b.name, &[]).is_empty() {
                    let wait_minutes = minutes_between(end_a, start_b).max(0) as u32;
                    return Some(SplitPlan {
                        date,
                        first,
                        second: SplitLeg {
                            service: service_b.to_string(),
                            professional: professional_b.name.clone(),
                            start: start_b,
                            duration_minutes: duration_b,
                        },
                        wait_minutes,
                    });
                }
            }
            start_b = add_minutes(start_b, grid.max(1))?;
        }

        None
    }
}
