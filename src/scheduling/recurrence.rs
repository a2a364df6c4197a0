//! Recurrence detection
//!
//! Learns how often a client books a service and, once the usual interval is
//! close, offers the next appointment proactively.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{RecurrenceConfig, SchedulingConfig};
use crate::models::{Event, Professional};
use crate::scheduling::accessor::EventStoreAccessor;
use crate::scheduling::availability::{occupied_ranges, suggest_slots, ConflictChecker};
use crate::scheduling::context::RequestContext;
use crate::scheduling::durations::DurationResolver;
use crate::services::notification::NotificationService;
use crate::utils::errors::Result;
use crate::utils::helpers::{format_date, format_time, normalize_name};
use crate::utils::time::{round_up_to_grid, TimeRange};

/// How far ahead existing bookings are looked up when deciding whether a pair is already booked
const UPCOMING_HORIZON_DAYS: i64 = 365;
const PROPOSAL_SLOTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecurrenceProposal {
    pub client_id: i64,
    pub service: String,
    pub cadence_days: i64,
    pub last_booking: NaiveDate,
    pub suggested_date: NaiveDate,
    pub suggested_times: Vec<NaiveTime>,
    pub professional: Option<String>,
}

/// Median gap between distinct booking dates, if there are enough bookings and
/// the median falls inside `[min_days, max_days]`
pub fn cadence_from_dates(dates: &[NaiveDate], min_history: usize, min_days: i64, max_days: i64) -> Option<i64> {
    let distinct: Vec<NaiveDate> = dates.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    if distinct.len() < min_history.max(2) {
        return None;
    }

    let mut gaps: Vec<i64> = distinct.windows(2).map(|w| (w[1] - w[0]).num_days()).collect();
    gaps.sort_unstable();
    let mid = gaps.len() / 2;
    let median = if gaps.len() % 2 == 0 {
        (gaps[mid - 1] + gaps[mid]) / 2
    } else {
        gaps[mid]
    };

    (min_days..=max_days).contains(&median).then_some(median)
}

#[derive(Clone)]
pub struct RecurrenceDetector {
    accessor: EventStoreAccessor,
    checker: ConflictChecker,
    durations: DurationResolver,
    config: RecurrenceConfig,
    scheduling: SchedulingConfig,
    tz: Tz,
    notifications: NotificationService,
}

/// Bookings of one (client, service) pair
struct PairHistory<'a> {
    past: Vec<&'a Event>,
    has_upcoming: bool,
}

impl RecurrenceDetector {
    pub fn new(
        accessor: EventStoreAccessor,
        checker: ConflictChecker,
        durations: DurationResolver,
        config: RecurrenceConfig,
        scheduling: SchedulingConfig,
        notifications: NotificationService,
    ) -> Result<Self> {
        let tz = scheduling.tz()?;
        Ok(Self {
            accessor,
            checker,
            durations,
            config,
            scheduling,
            tz,
            notifications,
        })
    }

    pub async fn detect_cadence(&self, business_id: i64, client_id: i64, service_key: &str) -> Result<Option<i64>> {
        let events = self.accessor.list_client_events(business_id, client_id).await?;
        let dates: Vec<NaiveDate> = events
            .iter()
            .filter(|e| e.is_active() && e.covers_service(service_key))
            .map(|e| e.date)
            .collect();
        Ok(self.cadence(&dates))
    }

    fn cadence(&self, dates: &[NaiveDate]) -> Option<i64> {
        cadence_from_dates(
            dates,
            self.config.min_history,
            self.config.min_cadence_days,
            self.config.max_cadence_days,
        )
    }

    /// Propose and send the next booking for every qualifying (client, service) pair
    pub async fn propose_next_booking(&self, ctx: &RequestContext, today: NaiveDate) -> Result<Vec<RecurrenceProposal>> {
        let from = today - Duration::days(self.config.lookback_days);
        let until = today + Duration::days(UPCOMING_HORIZON_DAYS);
        let events = self.accessor.list_events(ctx.business_id, from, until).await?;
        let professionals = self.accessor.list_professionals(ctx.business_id).await?;

        let mut pairs: BTreeMap<(i64, String), PairHistory> = BTreeMap::new();
        for event in &events {
            let Some(client_id) = event.client_id else {
                continue;
            };
            for key in event.service_keys() {
                let history = pairs.entry((client_id, key)).or_insert_with(|| PairHistory {
                    past: Vec::new(),
                    has_upcoming: false,
                });
                if event.date < today {
                    history.past.push(event);
                } else {
                    history.has_upcoming = true;
                }
            }
        }

        let mut proposals = Vec::new();
        for ((client_id, key), history) in pairs {
            if history.has_upcoming {
                continue;
            }
            let dates: Vec<NaiveDate> = history.past.iter().map(|e| e.date).collect();
            let Some(cadence) = self.cadence(&dates) else {
                continue;
            };
            let Some(last) = history.past.iter().max_by_key(|e| (e.date, e.start_time)) else {
                continue;
            };
            let days_since = (today - last.date).num_days();
            if days_since < self.config.min_days_since_last {
                continue;
            }

            let target = (last.date + Duration::days(cadence)).max(today);
            let professional = last
                .professional
                .as_ref()
                .and_then(|name| professionals.iter().find(|p| p.is_named(name)));
            let service = display_service(last, &key);
            let slots = self.proposal_slots(ctx, &events, last, professional, &service, target)?;
            if slots.is_empty() {
                debug!(client_id, service = %service, date = %target, "No free slot for recurrence proposal");
                continue;
            }

            let proposal = RecurrenceProposal {
                client_id,
                service,
                cadence_days: cadence,
                last_booking: last.date,
                suggested_date: target,
                suggested_times: slots.iter().map(|s| s.start).collect(),
                professional: last.professional.clone(),
            };
            self.notify(&proposal, days_since).await;
            proposals.push(proposal);
        }

        info!(business_id = ctx.business_id, proposals = proposals.len(), "Recurrence run finished");
        Ok(proposals)
    }

    /// Preferred times first, then the rest of the day in steps of the service duration
    fn proposal_slots(
        &self,
        ctx: &RequestContext,
        events: &[Event],
        last: &Event,
        professional: Option<&Professional>,
        service: &str,
        date: NaiveDate,
    ) -> Result<Vec<TimeRange>> {
        let duration = self.durations.resolve(professional, service);
        let earliest = if date == ctx.local_today(self.tz) {
            round_up_to_grid(ctx.local_time(self.tz), self.scheduling.grid_minutes)
        } else {
            Some(self.scheduling.opening_time)
        };
        let Some(window) = earliest.map(|t| self.checker.window_from(t)).transpose()?.flatten() else {
            return Ok(Vec::new());
        };

        let mut occupied = match &last.professional {
            Some(name) => occupied_ranges(events, date, name, &[]),
            None => events
                .iter()
                .filter(|e| e.date == date && e.client_id == last.client_id)
                .map(Event::time_range)
                .collect(),
        };

        let mut slots = Vec::new();
        for time in &self.config.preferred_times {
            if slots.len() >= PROPOSAL_SLOTS {
                break;
            }
            let Some(range) = TimeRange::from_duration(*time, duration) else {
                continue;
            };
            let inside = range.start >= window.start && range.end <= window.end;
            if inside && !occupied.iter().any(|busy| busy.overlaps(&range)) {
                slots.push(range);
                occupied.push(range);
            }
        }

        if slots.len() < PROPOSAL_SLOTS {
            slots.extend(suggest_slots(window, &occupied, duration, PROPOSAL_SLOTS - slots.len()));
        }
        slots.sort();
        Ok(slots)
    }

    async fn notify(&self, proposal: &RecurrenceProposal, days_since: i64) {
        let times = proposal
            .suggested_times
            .iter()
            .map(|t| format_time(*t))
            .collect::<Vec<_>>()
            .join(", ");
        self.notifications
            .notify(
                proposal.client_id,
                "recurrence_proposal",
                &[
                    ("days_since", days_since.to_string()),
                    ("service", proposal.service.clone()),
                    ("date", format_date(proposal.suggested_date)),
                    ("times", times),
                ],
            )
            .await;
    }
}

/// The service as the client wrote it on their last booking
fn display_service(event: &Event, key: &str) -> String {
    event
        .services
        .iter()
        .find(|s| normalize_name(s) == key)
        .cloned()
        .unwrap_or_else(|| event.description.clone())
}
