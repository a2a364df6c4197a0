//! Per-request context
//!
//! Every engine entry point receives the caller, the business the call is
//! scoped to and the instant the request is evaluated at.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::utils::errors::{Result, SecretaryBotError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub caller_id: i64,
    pub business_id: i64,
    pub now: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(caller_id: i64, business_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            caller_id,
            business_id,
            now,
        }
    }

    /// Context for a background job acting on behalf of a business owner
    pub fn for_business(business_id: i64, now: DateTime<Utc>) -> Self {
        Self::new(business_id, business_id, now)
    }

    pub fn is_owner(&self) -> bool {
        self.caller_id == self.business_id
    }

    /// Client a booking is made for. Owners may name any client; everyone else books for themselves.
    pub fn booking_client(&self, requested: Option<i64>) -> Result<i64> {
        match requested {
            Some(client_id) if client_id != self.caller_id && !self.is_owner() => Err(
                SecretaryBotError::PermissionDenied(format!("user {} cannot book for {}", self.caller_id, client_id)),
            ),
            Some(client_id) => Ok(client_id),
            None => Ok(self.caller_id),
        }
    }

    pub fn local_today(&self, tz: Tz) -> NaiveDate {
        self.now.with_timezone(&tz).date_naive()
    }

    pub fn local_time(&self, tz: Tz) -> NaiveTime {
        self.now.with_timezone(&tz).time()
    }
}
