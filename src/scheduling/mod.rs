//! Appointment scheduling engine
//!
//! Conflict checking, slot suggestions, split planning, fit-in orchestration
//! and recurrence detection over the storage traits.

pub mod accessor;
pub mod availability;
pub mod booking;
pub mod context;
pub mod durations;
pub mod fit_in;
pub mod recurrence;
pub mod split;

pub use accessor::EventStoreAccessor;
pub use availability::{find_conflicts, suggest_slots, ConflictChecker};
pub use booking::{AvailabilityReport, BookingOutcome, BookingRequest, BookingService, SplitBookingOutcome};
pub use context::RequestContext;
pub use durations::DurationResolver;
pub use fit_in::{FitInOrchestrator, FitInOutcome, FitInRequest, FitInStatus, RelocationOutcome, RelocationStatus};
pub use recurrence::{RecurrenceDetector, RecurrenceProposal};
pub use split::{SplitLeg, SplitPlan, SplitPlanner};

use std::sync::Arc;

use chrono_tz::Tz;

use crate::config::Settings;
use crate::database::DatabaseService;
use crate::services::notification::{Messenger, NotificationService};
use crate::services::reminder::{ReminderScheduler, ReminderService};
use crate::utils::errors::Result;

/// Every engine component, sharing one store and one messenger
#[derive(Clone)]
pub struct SchedulingEngine {
    pub accessor: EventStoreAccessor,
    pub checker: ConflictChecker,
    pub booking: BookingService,
    pub split: SplitPlanner,
    pub fit_in: FitInOrchestrator,
    pub recurrence: RecurrenceDetector,
    pub notifications: NotificationService,
    tz: Tz,
}

impl SchedulingEngine {
    pub fn new(db: DatabaseService, settings: &Settings, messenger: Arc<dyn Messenger>) -> Result<Self> {
        let tz = settings.scheduling.tz()?;
        let reminders: Arc<dyn ReminderScheduler> = Arc::new(ReminderService::new(db.reminders.clone(), tz));
        Self::with_reminders(db, settings, messenger, reminders)
    }

    pub fn with_reminders(
        db: DatabaseService,
        settings: &Settings,
        messenger: Arc<dyn Messenger>,
        reminders: Arc<dyn ReminderScheduler>,
    ) -> Result<Self> {
        let scheduling = settings.scheduling.clone();
        let tz = scheduling.tz()?;
        let notifications = NotificationService::new(messenger);
        let durations = DurationResolver::new(&scheduling.duration_overrides);
        let accessor = EventStoreAccessor::new(db);
        let checker = ConflictChecker::new(accessor.clone(), scheduling.clone());

        let booking = BookingService::new(
            accessor.clone(),
            checker.clone(),
            durations.clone(),
            scheduling.clone(),
            reminders.clone(),
            notifications.clone(),
        );
        let split = SplitPlanner::new(accessor.clone(), scheduling.clone(), durations.clone());
        let fit_in = FitInOrchestrator::new(
            accessor.clone(),
            checker.clone(),
            scheduling.clone(),
            reminders,
            notifications.clone(),
        )?;
        let recurrence = RecurrenceDetector::new(
            accessor.clone(),
            checker.clone(),
            durations,
            settings.recurrence.clone(),
            scheduling,
            notifications.clone(),
        )?;

        Ok(Self {
            accessor,
            checker,
            booking,
            split,
            fit_in,
            recurrence,
            notifications,
            tz,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Resolve the caller's business and build the context for one request
    pub async fn context_for(&self, caller_id: i64, now: chrono::DateTime<chrono::Utc>) -> Result<RequestContext> {
        let business_id = self.accessor.get_effective_business_id(caller_id).await?;
        Ok(RequestContext::new(caller_id, business_id, now))
    }
}
