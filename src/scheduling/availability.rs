//! Conflict checking and free-slot suggestions

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::config::SchedulingConfig;
use crate::models::{ConflictingInterval, Event, Professional};
use crate::scheduling::accessor::EventStoreAccessor;
use crate::utils::errors::{Result, SecretaryBotError};
use crate::utils::logging::log_conflict_check;
use crate::utils::time::{find_free_slots, TimeRange};

/// Active events of `professional` on `date` overlapping `range`.
///
/// Events without a professional never conflict, and neither does an empty
/// professional name. Ids in `exclude` are ignored.
pub fn find_conflicts(
    events: &[Event],
    date: NaiveDate,
    range: TimeRange,
    professional: &str,
    exclude: &[Uuid],
) -> Vec<ConflictingInterval> {
    if professional.trim().is_empty() {
        return Vec::new();
    }
    events
        .iter()
        .filter(|e| e.is_active() && e.date == date && !exclude.contains(&e.id))
        .filter(|e| e.is_assigned_to(professional))
        .filter(|e| e.time_range().overlaps(&range))
        .map(ConflictingInterval::from)
        .collect()
}

/// Ranges held by `professional` on `date`
pub fn occupied_ranges(events: &[Event], date: NaiveDate, professional: &str, exclude: &[Uuid]) -> Vec<TimeRange> {
    events
        .iter()
        .filter(|e| e.is_active() && e.date == date && !exclude.contains(&e.id))
        .filter(|e| e.is_assigned_to(professional))
        .map(Event::time_range)
        .collect()
}

/// Up to `max` free ranges of `duration_minutes`, scanning `window` in steps of
/// the duration itself
pub fn suggest_slots(window: TimeRange, occupied: &[TimeRange], duration_minutes: u32, max: usize) -> Vec<TimeRange> {
    find_free_slots(window, duration_minutes, duration_minutes, occupied, max)
}

#[derive(Clone)]
pub struct ConflictChecker {
    accessor: EventStoreAccessor,
    config: SchedulingConfig,
}

impl ConflictChecker {
    pub fn new(accessor: EventStoreAccessor, config: SchedulingConfig) -> Self {
        Self { accessor, config }
    }

    /// Opening to closing time
    pub fn business_window(&self) -> Result<TimeRange> {
        TimeRange::new(self.config.opening_time, self.config.closing_time)
    }

    /// Business window starting no earlier than `from`; `None` once closing time has passed
    pub fn window_from(&self, from: NaiveTime) -> Result<Option<TimeRange>> {
        let window = self.business_window()?;
        let start = from.max(window.start);
        Ok(TimeRange::new(start, window.end).ok())
    }

    pub async fn check_conflict(
        &self,
        business_id: i64,
        date: NaiveDate,
        start_time: NaiveTime,
        duration_minutes: u32,
        professional: &str,
        exclude: &[Uuid],
    ) -> Result<Vec<ConflictingInterval>> {
        let range = requested_range(start_time, duration_minutes)?;
        let events = self.accessor.list_events(business_id, date, date).await?;
        let conflicts = find_conflicts(&events, date, range, professional, exclude);
        log_conflict_check(business_id, professional, date, start_time, conflicts.len());
        Ok(conflicts)
    }

    /// Free ranges for `professional` on `date`, starting at the reference time
    pub async fn suggest_slots_for(
        &self,
        business_id: i64,
        date: NaiveDate,
        reference_time: NaiveTime,
        professional: &str,
        duration_minutes: u32,
    ) -> Result<Vec<TimeRange>> {
        let Some(window) = self.window_from(reference_time)? else {
            return Ok(Vec::new());
        };
        let events = self.accessor.list_events(business_id, date, date).await?;
        let occupied = occupied_ranges(&events, date, professional, &[]);
        Ok(suggest_slots(window, &occupied, duration_minutes, self.config.max_suggestions))
    }

    /// First professional other than the excluded one who performs `service` and is free at `range`
    pub async fn find_alternative_professional(
        &self,
        business_id: i64,
        date: NaiveDate,
        range: TimeRange,
        service: &str,
        exclude: &str,
    ) -> Result<Option<Professional>> {
        let mut professionals = self.accessor.list_professionals(business_id).await?;
        professionals.sort_by(|a, b| a.name.cmp(&b.name));
        let events = self.accessor.list_events(business_id, date, date).await?;

        Ok(professionals
            .into_iter()
            .filter(|p| !p.is_named(exclude) && p.performs(service))
            .find(|p| find_conflicts(&events, date, range, &p.name, &[]).is_empty()))
    }
}

pub(crate) fn requested_range(start_time: NaiveTime, duration_minutes: u32) -> Result<TimeRange> {
    if duration_minutes == 0 {
        return Err(SecretaryBotError::InvalidInput("Duration must be positive".to_string()));
    }
    TimeRange::from_duration(start_time, duration_minutes).ok_or_else(|| {
        SecretaryBotError::InvalidInput(format!(
            "{} minutes from {} runs past midnight",
            duration_minutes,
            start_time.format("%H:%M")
        ))
    })
}
