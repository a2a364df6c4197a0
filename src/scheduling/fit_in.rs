//! Fit-in (encaixe) orchestration
//!
//! An urgent request for an occupied slot becomes a pendency: up to two
//! clients holding the slot are offered alternative times, and the first one
//! to accept is moved. The move, the cancellation of the old booking and the
//! fit-in booking are written together.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SchedulingConfig;
use crate::database::{PendencyStore, RelocationWrite, SaveOutcome};
use crate::models::{
    AlternativeSlot, CandidateResponse, CreateReminderRequest, Event, EventStatus, FitInPendency, NewEvent,
    PendencyStatus, RelocationCandidate,
};
use crate::scheduling::accessor::EventStoreAccessor;
use crate::scheduling::availability::{occupied_ranges, requested_range, suggest_slots, ConflictChecker};
use crate::scheduling::booking::event_parameters;
use crate::scheduling::context::RequestContext;
use crate::services::notification::NotificationService;
use crate::services::reminder::ReminderScheduler;
use crate::utils::errors::{Result, SecretaryBotError};
use crate::utils::helpers::{format_date, format_time};
use crate::utils::logging::log_fit_in_transition;
use crate::utils::time::{round_up_to_grid, TimeRange};

const MAX_ALTERNATIVES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FitInRequest {
    pub description: String,
    pub professional: Option<String>,
    pub duration_minutes: u32,
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Client the fit-in is for; only owners may name someone other than themselves
    pub client_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitInStatus {
    /// The slot was free and the fit-in is booked
    Booked,
    /// Candidates were offered alternatives and a pendency is open
    AwaitingResponses,
    NoCandidate,
    NoSlotAvailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitInOutcome {
    pub status: FitInStatus,
    pub message: String,
    pub event: Option<Event>,
    pub pendency_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RelocationStatus {
    Relocated { relocated: Event, fit_in: Event },
    NoPendency,
    Expired,
    InvalidOption { available: usize },
    /// The chosen slot or the fit-in slot was taken after the offer
    SlotTaken,
    /// The booking being moved was cancelled after the offer
    BookingChanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelocationOutcome {
    pub status: RelocationStatus,
    pub message: String,
}

impl RelocationOutcome {
    fn new(status: RelocationStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct FitInOrchestrator {
    accessor: EventStoreAccessor,
    checker: ConflictChecker,
    pendencies: Arc<dyn PendencyStore>,
    config: SchedulingConfig,
    tz: Tz,
    reminders: Arc<dyn ReminderScheduler>,
    notifications: NotificationService,
}

fn slot_parameters(date: NaiveDate, time: NaiveTime) -> Vec<(&'static str, String)> {
    vec![("date", format_date(date)), ("time", format_time(time))]
}

impl FitInOrchestrator {
    pub fn new(
        accessor: EventStoreAccessor,
        checker: ConflictChecker,
        config: SchedulingConfig,
        reminders: Arc<dyn ReminderScheduler>,
        notifications: NotificationService,
    ) -> Result<Self> {
        let tz = config.tz()?;
        let pendencies = accessor.database().pendencies.clone();
        Ok(Self {
            accessor,
            checker,
            pendencies,
            config,
            tz,
            reminders,
            notifications,
        })
    }

    pub async fn request_fit_in(&self, ctx: &RequestContext, request: FitInRequest) -> Result<FitInOutcome> {
        if request.description.trim().is_empty() {
            return Err(SecretaryBotError::InvalidInput("Description is required".to_string()));
        }
        let desired = requested_range(request.time, request.duration_minutes)?;
        let professional = request.professional.clone().unwrap_or_default();
        let requester_id = ctx.booking_client(request.client_id)?;

        let conflicts = self
            .checker
            .check_conflict(ctx.business_id, request.date, request.time, request.duration_minutes, &professional, &[])
            .await?;
        if conflicts.is_empty() {
            let event = self.fit_in_event(ctx, &request, requester_id)?;
            if self.accessor.save_event(ctx.business_id, &event).await? == SaveOutcome::Saved {
                info!(business_id = ctx.business_id, event_id = %event.id, "Fit-in booked directly");
                self.schedule_reminder(&event).await;
                let message = self
                    .notifications
                    .format_message("fit_in_booked", &event_parameters(&event))?;
                return Ok(FitInOutcome {
                    status: FitInStatus::Booked,
                    message,
                    event: Some(event),
                    pendency_id: None,
                });
            }
        }

        let events = self.accessor.list_events(ctx.business_id, request.date, request.date).await?;
        let mut overlapping: Vec<&Event> = events
            .iter()
            .filter(|e| e.date == request.date && e.client_id.is_some())
            .filter(|e| professional.trim().is_empty() || e.is_assigned_to(&professional))
            .filter(|e| e.time_range().overlaps(&desired))
            .collect();
        overlapping.sort_by_key(|e| e.start_time);
        overlapping.truncate(self.config.fit_in_max_candidates);

        let mut pendency = self.new_pendency(ctx, &request, requester_id);
        if overlapping.is_empty() {
            return self.close_terminal(pendency, PendencyStatus::NoCandidate, "fit_in_no_candidate").await;
        }

        for event in overlapping {
            let alternatives = self.find_alternatives(ctx, event, request.date, desired).await?;
            if alternatives.is_empty() {
                continue;
            }
            if let Some(client_id) = event.client_id {
                pendency.candidates.push(RelocationCandidate {
                    event_id: event.id,
                    affected_client_id: client_id,
                    original_event: event.clone(),
                    alternatives,
                    response: CandidateResponse::Awaiting,
                });
            }
        }
        if pendency.candidates.is_empty() {
            return self.close_terminal(pendency, PendencyStatus::NoSlotAvailable, "fit_in_no_slot").await;
        }

        self.pendencies.insert_pendency(&pendency).await?;
        log_fit_in_transition(pendency.id, ctx.business_id, "created", PendencyStatus::Pending.as_str());

        for candidate in &pendency.candidates {
            let options = candidate
                .alternatives
                .iter()
                .enumerate()
                .map(|(i, slot)| format!("{}. {}", i + 1, slot))
                .collect::<Vec<_>>()
                .join("\n");
            let mut parameters = event_parameters(&candidate.original_event);
            parameters.push(("options", options));
            self.notifications
                .notify(candidate.affected_client_id, "fit_in_offer", &parameters)
                .await;
        }

        let mut parameters = slot_parameters(request.date, request.time);
        parameters.push(("count", pendency.candidates.len().to_string()));
        let message = self.notifications.format_message("fit_in_waiting", &parameters)?;

        Ok(FitInOutcome {
            status: FitInStatus::AwaitingResponses,
            message,
            event: None,
            pendency_id: Some(pendency.id),
        })
    }

    fn new_pendency(&self, ctx: &RequestContext, request: &FitInRequest, requester_id: i64) -> FitInPendency {
        FitInPendency {
            id: Uuid::new_v4(),
            business_id: ctx.business_id,
            requester_id,
            description: request.description.trim().to_string(),
            desired_date: request.date,
            desired_time: request.time,
            duration_minutes: request.duration_minutes as i32,
            professional: request.professional.clone().filter(|p| !p.trim().is_empty()),
            candidates: Vec::new(),
            status: PendencyStatus::Pending,
            created_at: ctx.now,
            expires_at: ctx.now + Duration::hours(self.config.pendency_ttl_hours),
            updated_at: ctx.now,
        }
    }

    /// Persist a pendency that ended before any client was asked
    async fn close_terminal(
        &self,
        mut pendency: FitInPendency,
        status: PendencyStatus,
        template_key: &str,
    ) -> Result<FitInOutcome> {
        pendency.status = status;
        self.pendencies.insert_pendency(&pendency).await?;
        log_fit_in_transition(pendency.id, pendency.business_id, "created", status.as_str());

        let message = self
            .notifications
            .format_message(template_key, &slot_parameters(pendency.desired_date, pendency.desired_time))?;
        Ok(FitInOutcome {
            status: match status {
                PendencyStatus::NoCandidate => FitInStatus::NoCandidate,
                _ => FitInStatus::NoSlotAvailable,
            },
            message,
            event: None,
            pendency_id: Some(pendency.id),
        })
    }

    /// Free slots of the candidate's own duration over the search horizon, with the
    /// candidate's slot vacated and the fit-in slot reserved
    async fn find_alternatives(
        &self,
        ctx: &RequestContext,
        candidate: &Event,
        fit_in_date: NaiveDate,
        desired: TimeRange,
    ) -> Result<Vec<AlternativeSlot>> {
        let days = i64::from(self.config.fit_in_search_days.max(1));
        let last_day = fit_in_date + Duration::days(days - 1);
        let events = self.accessor.list_events(ctx.business_id, fit_in_date, last_day).await?;
        let today = ctx.local_today(self.tz);
        let duration = candidate.duration_minutes();

        let mut alternatives = Vec::new();
        for offset in 0..days {
            let date = fit_in_date + Duration::days(offset);
            if date < today {
                continue;
            }

            let earliest = if date == today {
                match round_up_to_grid(ctx.local_time(self.tz), self.config.grid_minutes) {
                    Some(time) => time,
                    None => continue,
                }
            } else {
                self.config.opening_time
            };
            let Some(window) = self.checker.window_from(earliest)? else {
                continue;
            };

            let mut occupied = match &candidate.professional {
                Some(name) => occupied_ranges(&events, date, name, &[candidate.id]),
                None => events
                    .iter()
                    .filter(|e| e.date == date && e.id != candidate.id && e.client_id == candidate.client_id)
                    .map(Event::time_range)
                    .collect(),
            };
            if date == fit_in_date {
                occupied.push(desired);
            }

            let remaining = MAX_ALTERNATIVES - alternatives.len();
            alternatives.extend(
                suggest_slots(window, &occupied, duration, remaining)
                    .into_iter()
                    .map(|range| AlternativeSlot { date, range }),
            );
            if alternatives.len() >= MAX_ALTERNATIVES {
                break;
            }
        }

        Ok(alternatives)
    }

    fn fit_in_event(&self, ctx: &RequestContext, request: &FitInRequest, requester_id: i64) -> Result<Event> {
        NewEvent {
            description: request.description.clone(),
            services: Vec::new(),
            date: request.date,
            start_time: request.time,
            duration_minutes: request.duration_minutes,
            professional: request.professional.clone(),
            client_id: Some(requester_id),
            status: EventStatus::FitInConfirmed,
        }
        .into_event(ctx.business_id, ctx.now)
    }

    async fn schedule_reminder(&self, event: &Event) {
        let Some(user_id) = event.client_id else {
            return;
        };
        let request = CreateReminderRequest {
            user_id,
            description: event.description.clone(),
            date: event.date,
            time: event.start_time,
            minutes_before: self.config.reminder_minutes_before,
        };
        if let Err(e) = self.reminders.schedule_reminder(request).await {
            warn!(event_id = %event.id, error = %e, "Could not schedule reminder");
        }
    }

    /// Apply a client's numbered answer (1-based) to the pendency they are part of
    pub async fn confirm_relocation_choice(
        &self,
        ctx: &RequestContext,
        client_id: i64,
        chosen_option: usize,
    ) -> Result<RelocationOutcome> {
        let Some(mut pendency) = self.pendencies.latest_pending_for_client(ctx.business_id, client_id).await? else {
            return Ok(RelocationOutcome::new(
                RelocationStatus::NoPendency,
                "Não há nenhuma proposta de remanejamento aguardando sua resposta.",
            ));
        };

        if pendency.is_expired(ctx.now) {
            self.expire(&mut pendency, ctx).await?;
            return Ok(RelocationOutcome::new(
                RelocationStatus::Expired,
                "Esta proposta de remanejamento expirou. Seu agendamento continua como estava.",
            ));
        }

        let Some(candidate) = pendency.awaiting_candidate(client_id).cloned() else {
            return Ok(RelocationOutcome::new(
                RelocationStatus::NoPendency,
                "Não há nenhuma proposta de remanejamento aguardando sua resposta.",
            ));
        };
        let available = candidate.alternatives.len();
        let Some(slot) = chosen_option
            .checked_sub(1)
            .and_then(|index| candidate.alternatives.get(index))
            .copied()
        else {
            return Ok(RelocationOutcome::new(
                RelocationStatus::InvalidOption { available },
                format!("Opção inválida. Responda com um número de 1 a {}.", available),
            ));
        };

        let today = ctx.local_today(self.tz);
        if slot.date < today || (slot.date == today && slot.range.start < ctx.local_time(self.tz)) {
            return Ok(RelocationOutcome::new(
                RelocationStatus::SlotTaken,
                "Esse horário já passou. Escolha outra opção.",
            ));
        }

        let Some(current) = self.accessor.get_event(ctx.business_id, candidate.event_id).await? else {
            return Ok(RelocationOutcome::new(
                RelocationStatus::BookingChanged,
                "Seu agendamento original não foi encontrado.",
            ));
        };
        let relocated = current.relocated_copy(slot.date, slot.range, ctx.now);
        let fit_in_professional = pendency.professional.clone().or_else(|| current.professional.clone());
        let fit_in = NewEvent {
            description: pendency.description.clone(),
            services: Vec::new(),
            date: pendency.desired_date,
            start_time: pendency.desired_time,
            duration_minutes: pendency.desired_range()?.duration_minutes(),
            professional: fit_in_professional,
            client_id: Some(pendency.requester_id),
            status: EventStatus::FitInConfirmed,
        }
        .into_event(ctx.business_id, ctx.now)?;

        let mut concluded = pendency.clone();
        let superseded = concluded.conclude(client_id, ctx.now)?;
        let write = RelocationWrite {
            business_id: ctx.business_id,
            original_event_id: current.id,
            relocated: relocated.clone(),
            fit_in: fit_in.clone(),
            sibling_event_ids: pendency
                .candidates
                .iter()
                .filter(|c| c.event_id != current.id)
                .map(|c| c.event_id)
                .collect(),
            pendency: concluded,
        };
        match self.accessor.apply_relocation(&write).await? {
            SaveOutcome::Saved => {}
            SaveOutcome::Conflict(conflicts) => {
                info!(pendency_id = %pendency.id, conflicts = conflicts.len(), "Relocation target no longer free");
                return Ok(RelocationOutcome::new(
                    RelocationStatus::SlotTaken,
                    "Esse horário não está mais disponível. Escolha outra opção.",
                ));
            }
            SaveOutcome::Missing => {
                return Ok(RelocationOutcome::new(
                    RelocationStatus::BookingChanged,
                    "Seu agendamento original foi alterado ou a proposta já foi encerrada.",
                ));
            }
        }

        let pendency = write.pendency;
        log_fit_in_transition(pendency.id, ctx.business_id, "pending", pendency.status.as_str());

        self.schedule_reminder(&relocated).await;
        self.schedule_reminder(&fit_in).await;
        self.notifications
            .notify(pendency.requester_id, "fit_in_confirmed", &event_parameters(&fit_in))
            .await;
        for candidate in pendency.candidates.iter().filter(|c| superseded.contains(&c.affected_client_id)) {
            self.notifications
                .notify(
                    candidate.affected_client_id,
                    "relocation_superseded",
                    &event_parameters(&candidate.original_event),
                )
                .await;
        }

        let message = self
            .notifications
            .format_message("relocation_confirmed", &event_parameters(&relocated))?;
        Ok(RelocationOutcome::new(
            RelocationStatus::Relocated { relocated, fit_in },
            message,
        ))
    }

    async fn expire(&self, pendency: &mut FitInPendency, ctx: &RequestContext) -> Result<()> {
        let waiting: Vec<RelocationCandidate> = pendency
            .candidates
            .iter()
            .filter(|c| c.response == CandidateResponse::Awaiting)
            .cloned()
            .collect();

        pendency.close(PendencyStatus::Expired, ctx.now)?;
        self.pendencies.update_pendency(pendency).await?;
        log_fit_in_transition(pendency.id, pendency.business_id, "pending", PendencyStatus::Expired.as_str());

        self.notifications
            .notify(
                pendency.requester_id,
                "fit_in_expired",
                &slot_parameters(pendency.desired_date, pendency.desired_time),
            )
            .await;
        for candidate in waiting {
            self.notifications
                .notify(
                    candidate.affected_client_id,
                    "relocation_superseded",
                    &event_parameters(&candidate.original_event),
                )
                .await;
        }
        Ok(())
    }

    /// Expire every pending pendency past its deadline; returns how many were closed
    pub async fn expire_stale_pendencies(&self, ctx: &RequestContext) -> Result<usize> {
        let stale = self.pendencies.list_expired_pending(ctx.now).await?;
        let mut expired = 0;
        for mut pendency in stale.into_iter().filter(|p| p.business_id == ctx.business_id) {
            match self.expire(&mut pendency, ctx).await {
                Ok(()) => expired += 1,
                Err(e) => warn!(pendency_id = %pendency.id, error = %e, "Could not expire pendency"),
            }
        }
        if expired > 0 {
            info!(expired, "Stale fit-in pendencies expired");
        }
        Ok(expired)
    }
}
