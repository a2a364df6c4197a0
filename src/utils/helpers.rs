//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use regex::Regex;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::utils::errors::{Result, SecretaryBotError};

/// Case- and diacritic-insensitive key for professional and service names
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Compare two names ignoring case and diacritics
pub fn same_name(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}

/// Parse a date as `YYYY-MM-DD` or `DD/MM/YYYY`
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%d/%m/%Y"))
        .map_err(|_| SecretaryBotError::InvalidInput(format!("Invalid date: {}", input)))
}

fn time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<h>[01]?\d|2[0-3])(?:\s*(?::|h)\s*(?P<m>[0-5]\d)?)?(?:min)?$")
            .expect("time pattern is valid")
    })
}

/// Parse a time of day: `14:00`, `14:00:00`, `14h`, `14h30` or `14`
pub fn parse_time(input: &str) -> Result<NaiveTime> {
    let input = input.trim().to_lowercase();
    if let Ok(time) = NaiveTime::parse_from_str(&input, "%H:%M:%S") {
        return Ok(time);
    }

    let invalid = || SecretaryBotError::InvalidInput(format!("Invalid time: {}", input));
    let captures = time_pattern().captures(&input).ok_or_else(invalid)?;
    let hour: u32 = captures["h"].parse().map_err(|_| invalid())?;
    let minute: u32 = match captures.name("m") {
        Some(m) => m.as_str().parse().map_err(|_| invalid())?,
        None => 0,
    };

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Parse a 1-based option number from a short reply such as "2" or "opção 2"
pub fn parse_option_number(input: &str) -> Option<usize> {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    digits.parse().ok().filter(|n| *n > 0)
}

/// Format a date for user display
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Format a time of day for user display
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Convert a local date and time in the business timezone to UTC.
///
/// Ambiguous local times resolve to the earliest instant; nonexistent ones are rejected.
pub fn local_to_utc(tz: Tz, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>> {
    date.and_time(time)
        .and_local_timezone(tz)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| SecretaryBotError::InvalidInput(format!(
            "{} {} does not exist in {}",
            date, time, tz
        )))
}

/// Truncate text to a maximum length with ellipsis
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_length.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
