//! Periodic maintenance
//!
//! Runs the recurrence detector for every business and expires fit-in
//! pendencies nobody answered in time.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::RecurrenceConfig;
use crate::database::DatabaseService;
use crate::scheduling::{RequestContext, SchedulingEngine};
use crate::utils::errors::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub businesses: usize,
    pub proposals: usize,
    pub expired_pendencies: usize,
    pub failures: usize,
}

#[derive(Clone)]
pub struct MaintenanceRunner {
    database: DatabaseService,
    engine: SchedulingEngine,
    recurrence: RecurrenceConfig,
}

impl MaintenanceRunner {
    pub fn new(database: DatabaseService, engine: SchedulingEngine, recurrence: RecurrenceConfig) -> Self {
        Self {
            database,
            engine,
            recurrence,
        }
    }

    /// One pass over every business. A failing business is logged and skipped.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<MaintenanceReport> {
        let owners = self.database.profiles.list_business_owner_ids().await?;
        let mut report = MaintenanceReport {
            businesses: owners.len(),
            ..MaintenanceReport::default()
        };

        for business_id in owners {
            let ctx = RequestContext::for_business(business_id, now);

            match self.engine.fit_in.expire_stale_pendencies(&ctx).await {
                Ok(count) => report.expired_pendencies += count,
                Err(e) => {
                    warn!(business_id, error = %e, "Pendency expiry failed");
                    report.failures += 1;
                }
            }

            if !self.recurrence.enabled {
                continue;
            }
            let today = ctx.local_today(self.engine.timezone());
            match self.engine.recurrence.propose_next_booking(&ctx, today).await {
                Ok(proposals) => report.proposals += proposals.len(),
                Err(e) => {
                    warn!(business_id, error = %e, "Recurrence run failed");
                    report.failures += 1;
                }
            }
        }

        Ok(report)
    }

    /// Run forever on a fixed interval
    pub fn spawn(self, interval: Duration) -> tokio::task::JoinHandle<()> {
        info!("Started maintenance task with interval {:?}", interval);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match self.run_once(Utc::now()).await {
                    Ok(report) => info!(
                        businesses = report.businesses,
                        proposals = report.proposals,
                        expired = report.expired_pendencies,
                        failures = report.failures,
                        "Maintenance pass finished"
                    ),
                    Err(e) => error!("Maintenance pass failed: {}", e),
                }
            }
        })
    }
}
