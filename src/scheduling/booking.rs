//! Booking service
//!
//! Direct bookings, availability checks, cancellations, agenda listing and
//! persistence of split plans. Every write goes through the conditional save.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SchedulingConfig;
use crate::database::SaveOutcome;
use crate::models::{ConflictingInterval, CreateReminderRequest, Event, EventStatus, NewEvent};
use crate::scheduling::accessor::EventStoreAccessor;
use crate::scheduling::availability::{requested_range, ConflictChecker};
use crate::scheduling::context::RequestContext;
use crate::scheduling::durations::DurationResolver;
use crate::scheduling::split::{SplitLeg, SplitPlan};
use crate::services::notification::NotificationService;
use crate::services::reminder::ReminderScheduler;
use crate::utils::errors::{Result, SecretaryBotError};
use crate::utils::helpers::{format_date, format_time};
use crate::utils::logging::log_booking_action;
use crate::utils::time::TimeRange;

/// Attempts of the conditional save before a lost race is reported as a conflict
const SAVE_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub description: String,
    #[serde(default)]
    pub services: Vec<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    /// Resolved from the service when absent
    pub duration_minutes: Option<u32>,
    pub professional: Option<String>,
    pub client_id: Option<i64>,
}

impl BookingRequest {
    fn primary_service(&self) -> &str {
        self.services
            .iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| self.description.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BookingOutcome {
    Booked {
        event: Event,
    },
    Conflict {
        conflicts: Vec<ConflictingInterval>,
        suggestions: Vec<TimeRange>,
        alternative_professional: Option<String>,
    },
}

impl BookingOutcome {
    pub fn is_conflict(&self) -> bool {
        matches!(self, BookingOutcome::Conflict { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityReport {
    pub available: bool,
    pub conflicts: Vec<ConflictingInterval>,
    pub suggestions: Vec<TimeRange>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SplitBookingOutcome {
    Booked { first: Event, second: Event },
    /// One leg was taken between planning and saving; nothing was kept
    SlotTaken,
}

#[derive(Clone)]
pub struct BookingService {
    accessor: EventStoreAccessor,
    checker: ConflictChecker,
    durations: DurationResolver,
    config: SchedulingConfig,
    reminders: Arc<dyn ReminderScheduler>,
    notifications: NotificationService,
}

impl BookingService {
    pub fn new(
        accessor: EventStoreAccessor,
        checker: ConflictChecker,
        durations: DurationResolver,
        config: SchedulingConfig,
        reminders: Arc<dyn ReminderScheduler>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            accessor,
            checker,
            durations,
            config,
            reminders,
            notifications,
        }
    }

    async fn resolve_duration(&self, business_id: i64, request: &BookingRequest) -> Result<u32> {
        if let Some(minutes) = request.duration_minutes {
            if minutes == 0 {
                return Err(SecretaryBotError::InvalidInput("Duration must be positive".to_string()));
            }
            return Ok(minutes);
        }
        let professional = match &request.professional {
            Some(name) => self
                .accessor
                .list_professionals(business_id)
                .await?
                .into_iter()
                .find(|p| p.is_named(name)),
            None => None,
        };
        Ok(self.durations.resolve(professional.as_ref(), request.primary_service()))
    }

    pub async fn book(&self, ctx: &RequestContext, request: BookingRequest) -> Result<BookingOutcome> {
        if request.description.trim().is_empty() {
            return Err(SecretaryBotError::InvalidInput("Description is required".to_string()));
        }
        let duration = self.resolve_duration(ctx.business_id, &request).await?;
        let range = requested_range(request.start_time, duration)?;
        let professional = request.professional.clone().unwrap_or_default();

        let conflicts = self
            .checker
            .check_conflict(ctx.business_id, request.date, request.start_time, duration, &professional, &[])
            .await?;
        if !conflicts.is_empty() {
            return self.conflict_outcome(ctx, &request, range, conflicts).await;
        }

        let client_id = ctx.booking_client(request.client_id)?;
        let event = NewEvent {
            description: request.description.clone(),
            services: request.services.clone(),
            date: request.date,
            start_time: request.start_time,
            duration_minutes: duration,
            professional: request.professional.clone(),
            client_id: Some(client_id),
            status: EventStatus::Pending,
        }
        .into_event(ctx.business_id, ctx.now)?;

        // A lost race is retried only when the booking that won it is gone again
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.accessor.save_event(ctx.business_id, &event).await? {
                SaveOutcome::Saved => break,
                SaveOutcome::Conflict(conflicts) => {
                    let current = self
                        .checker
                        .check_conflict(ctx.business_id, request.date, request.start_time, duration, &professional, &[])
                        .await?;
                    if !current.is_empty() || attempt >= SAVE_ATTEMPTS {
                        warn!(business_id = ctx.business_id, attempt, "Slot taken concurrently, reporting conflict");
                        let conflicts = if current.is_empty() { conflicts } else { current };
                        return self.conflict_outcome(ctx, &request, range, conflicts).await;
                    }
                }
                SaveOutcome::Missing => {
                    return Err(SecretaryBotError::StoreUnavailable("insert reported a missing record".to_string()));
                }
            }
        }

        log_booking_action(
            ctx.business_id,
            "book",
            Some(event.id),
            event.professional.as_deref(),
            event.date,
            event.start_time,
        );
        self.after_booking(ctx, &event, "booking_created").await;

        Ok(BookingOutcome::Booked { event })
    }

    async fn conflict_outcome(
        &self,
        ctx: &RequestContext,
        request: &BookingRequest,
        range: TimeRange,
        conflicts: Vec<ConflictingInterval>,
    ) -> Result<BookingOutcome> {
        let professional = request.professional.clone().unwrap_or_default();
        let suggestions = self
            .checker
            .suggest_slots_for(ctx.business_id, request.date, request.start_time, &professional, range.duration_minutes())
            .await?;
        let alternative_professional = self
            .checker
            .find_alternative_professional(ctx.business_id, request.date, range, request.primary_service(), &professional)
            .await?
            .map(|p| p.name);

        Ok(BookingOutcome::Conflict {
            conflicts,
            suggestions,
            alternative_professional,
        })
    }

    /// Reminder for the client and, when booked on someone's behalf, a notice to them
    async fn after_booking(&self, ctx: &RequestContext, event: &Event, template_key: &str) {
        let Some(client_id) = event.client_id else {
            return;
        };

        let reminder = CreateReminderRequest {
            user_id: client_id,
            description: event.description.clone(),
            date: event.date,
            time: event.start_time,
            minutes_before: self.config.reminder_minutes_before,
        };
        if let Err(e) = self.reminders.schedule_reminder(reminder).await {
            warn!(event_id = %event.id, error = %e, "Could not schedule reminder");
        }

        if client_id != ctx.caller_id {
            self.notifications
                .notify(client_id, template_key, &event_parameters(event))
                .await;
        }
    }

    pub async fn check_availability(
        &self,
        ctx: &RequestContext,
        date: NaiveDate,
        start_time: NaiveTime,
        duration_minutes: u32,
        professional: &str,
    ) -> Result<AvailabilityReport> {
        let conflicts = self
            .checker
            .check_conflict(ctx.business_id, date, start_time, duration_minutes, professional, &[])
            .await?;
        let suggestions = if conflicts.is_empty() {
            Vec::new()
        } else {
            self.checker
                .suggest_slots_for(ctx.business_id, date, start_time, professional, duration_minutes)
                .await?
        };

        Ok(AvailabilityReport {
            available: conflicts.is_empty(),
            conflicts,
            suggestions,
        })
    }

    /// Soft-cancel an event of the caller's business. Clients may only cancel their own.
    pub async fn cancel(&self, ctx: &RequestContext, event_id: Uuid) -> Result<Event> {
        let event = self
            .accessor
            .get_event(ctx.business_id, event_id)
            .await?
            .ok_or(SecretaryBotError::EventNotFound { event_id })?;
        if !self.may_manage(ctx, &event) {
            return Err(SecretaryBotError::PermissionDenied(format!(
                "user {} cannot cancel event {}",
                ctx.caller_id, event_id
            )));
        }

        let cancelled = self.accessor.cancel_event(ctx.business_id, event_id).await?;
        log_booking_action(
            ctx.business_id,
            "cancel",
            Some(event_id),
            cancelled.professional.as_deref(),
            cancelled.date,
            cancelled.start_time,
        );
        if let Some(client_id) = cancelled.client_id.filter(|id| *id != ctx.caller_id) {
            self.notifications
                .notify(client_id, "booking_cancelled", &event_parameters(&cancelled))
                .await;
        }

        Ok(cancelled)
    }

    fn may_manage(&self, ctx: &RequestContext, event: &Event) -> bool {
        ctx.is_owner() || event.client_id == Some(ctx.caller_id)
    }

    /// Active events of a day; clients only see their own
    pub async fn list_day(&self, ctx: &RequestContext, date: NaiveDate) -> Result<Vec<Event>> {
        let events = self.accessor.list_events(ctx.business_id, date, date).await?;
        Ok(events.into_iter().filter(|e| self.may_manage(ctx, e)).collect())
    }

    /// Upcoming active events the caller may cancel, from `from` on
    pub async fn list_cancellable(&self, ctx: &RequestContext, from: NaiveDate) -> Result<Vec<Event>> {
        let events = if ctx.is_owner() {
            let until = from + chrono::Duration::days(60);
            self.accessor.list_events(ctx.business_id, from, until).await?
        } else {
            self.accessor.list_client_events(ctx.business_id, ctx.caller_id).await?
        };
        Ok(events
            .into_iter()
            .filter(|e| e.is_active() && e.date >= from)
            .collect())
    }

    /// Persist both legs of a plan for a client; the first leg is cancelled if the second is lost
    pub async fn book_split_plan(
        &self,
        ctx: &RequestContext,
        plan: &SplitPlan,
        client_id: Option<i64>,
    ) -> Result<SplitBookingOutcome> {
        let client_id = Some(ctx.booking_client(client_id)?);
        let first = self.leg_event(ctx, plan.date, &plan.first, client_id)?;
        let second = self.leg_event(ctx, plan.date, &plan.second, client_id)?;

        if self.accessor.save_event(ctx.business_id, &first).await? != SaveOutcome::Saved {
            return Ok(SplitBookingOutcome::SlotTaken);
        }
        if self.accessor.save_event(ctx.business_id, &second).await? != SaveOutcome::Saved {
            self.accessor.cancel_event(ctx.business_id, first.id).await?;
            info!(business_id = ctx.business_id, "Second leg taken, split booking rolled back");
            return Ok(SplitBookingOutcome::SlotTaken);
        }

        for event in [&first, &second] {
            log_booking_action(
                ctx.business_id,
                "book_split",
                Some(event.id),
                event.professional.as_deref(),
                event.date,
                event.start_time,
            );
        }
        self.after_booking(ctx, &first, "booking_created").await;
        self.after_booking(ctx, &second, "booking_created").await;

        Ok(SplitBookingOutcome::Booked { first, second })
    }

    fn leg_event(&self, ctx: &RequestContext, date: NaiveDate, leg: &SplitLeg, client_id: Option<i64>) -> Result<Event> {
        NewEvent {
            description: leg.service.clone(),
            services: vec![leg.service.clone()],
            date,
            start_time: leg.start,
            duration_minutes: leg.duration_minutes,
            professional: Some(leg.professional.clone()),
            client_id,
            status: EventStatus::Pending,
        }
        .into_event(ctx.business_id, ctx.now)
    }
}

/// Template parameters describing an event
pub(crate) fn event_parameters(event: &Event) -> Vec<(&'static str, String)> {
    vec![
        ("description", event.description.clone()),
        ("date", format_date(event.date)),
        ("time", format_time(event.start_time)),
        (
            "professional",
            event
                .professional
                .as_ref()
                .map(|p| format!(" com {}", p))
                .unwrap_or_default(),
        ),
    ]
}
