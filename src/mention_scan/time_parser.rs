// src/mention_scan/time_parser.rs
//! Relative timestamps ("2d", "3 weeks ago", "15 minutes") to calendar dates.

use chrono::{Days, NaiveDate};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("Unrecognized relative time: '{0}'")]
    Unrecognized(String),

    #[error("No count found in relative time: '{0}'")]
    MissingCount(String),

    #[error("Invalid count in relative time: '{0}'")]
    InvalidCount(String),

    #[error("Relative time out of calendar range: '{0}'")]
    OutOfRange(String),
}

/// Shape of a relative-time string, decided in a fixed order because the
/// markers overlap ("days" also contains "d", "weeks" contains "w").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeTimeKind {
    MinutesAgo,
    HoursAgo,
    Days,
    Weeks,
    DayShorthand,
    WeekShorthand,
    Unrecognized,
}

impl RelativeTimeKind {
    pub fn classify(text: &str) -> Self {
        if text.contains("minute") {
            Self::MinutesAgo
        } else if text.contains("hour") {
            Self::HoursAgo
        } else if text.contains("day") {
            Self::Days
        } else if text.contains("week") {
            Self::Weeks
        } else if text.contains('d') {
            Self::DayShorthand
        } else if text.contains('w') {
            Self::WeekShorthand
        } else {
            Self::Unrecognized
        }
    }
}

/// Resolve `text` against `reference`. The input is lower-cased and trimmed
/// here, so raw scraped text can be passed as is.
pub fn parse(text: &str, reference: NaiveDate) -> Result<NaiveDate, ParseFailure> {
    let text = text.trim().to_lowercase();

    let days = match RelativeTimeKind::classify(&text) {
        RelativeTimeKind::MinutesAgo | RelativeTimeKind::HoursAgo => 0,
        RelativeTimeKind::Days => count_before(&text, "day")?,
        RelativeTimeKind::Weeks => weeks_to_days(&text, count_before(&text, "week")?)?,
        RelativeTimeKind::DayShorthand => all_digits(&text)?,
        RelativeTimeKind::WeekShorthand => weeks_to_days(&text, all_digits(&text)?)?,
        RelativeTimeKind::Unrecognized => return Err(ParseFailure::Unrecognized(text)),
    };

    reference
        .checked_sub_days(Days::new(days))
        .ok_or(ParseFailure::OutOfRange(text))
}

/// Everything before the first `unit` must be a single integer, so
/// "3 days ago" parses and "a day ago" or "yesterday" do not.
fn count_before(text: &str, unit: &str) -> Result<u64, ParseFailure> {
    let prefix = text.split(unit).next().unwrap_or_default().trim();
    if prefix.is_empty() {
        return Err(ParseFailure::MissingCount(text.to_string()));
    }
    prefix
        .parse::<u64>()
        .map_err(|_| ParseFailure::InvalidCount(text.to_string()))
}

/// Shorthand forms keep only the digits, wherever they are ("5d", "2w •").
fn all_digits(text: &str) -> Result<u64, ParseFailure> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(ParseFailure::MissingCount(text.to_string()));
    }
    digits
        .parse::<u64>()
        .map_err(|_| ParseFailure::InvalidCount(text.to_string()))
}

fn weeks_to_days(text: &str, weeks: u64) -> Result<u64, ParseFailure> {
    weeks
        .checked_mul(7)
        .ok_or_else(|| ParseFailure::OutOfRange(text.to_string()))
}
