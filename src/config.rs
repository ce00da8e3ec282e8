// src/config.rs
use thiserror::Error;

pub const DEFAULT_RECENCY_WINDOW_DAYS: u32 = 7;
pub const DEFAULT_SCROLL_ITERATIONS: u32 = 50;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Company name is required")]
    EmptyMention,

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: i64 },

    #[error("{field} is not a valid number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
}

/// Inputs of one scrape run. Only constructible through validation, and
/// never changed once a run has started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeParameters {
    target_mention: String,
    recency_window_days: u32,
    scroll_iterations: u32,
}

impl ScrapeParameters {
    pub fn new(
        target_mention: &str,
        recency_window_days: i64,
        scroll_iterations: i64,
    ) -> Result<Self, ValidationError> {
        let target_mention = target_mention.trim();
        if target_mention.is_empty() {
            return Err(ValidationError::EmptyMention);
        }

        Ok(Self {
            target_mention: target_mention.to_string(),
            recency_window_days: positive("Days filter", recency_window_days)?,
            scroll_iterations: positive("Scroll count", scroll_iterations)?,
        })
    }

    /// Same as [`ScrapeParameters::new`], for numbers typed by a user.
    pub fn from_text(
        target_mention: &str,
        recency_window_days: &str,
        scroll_iterations: &str,
    ) -> Result<Self, ValidationError> {
        Self::new(
            target_mention,
            parse_number("Days filter", recency_window_days)?,
            parse_number("Scroll count", scroll_iterations)?,
        )
    }

    pub fn target_mention(&self) -> &str {
        &self.target_mention
    }

    pub fn recency_window_days(&self) -> u32 {
        self.recency_window_days
    }

    pub fn scroll_iterations(&self) -> u32 {
        self.scroll_iterations
    }
}

pub fn parse_number(field: &'static str, value: &str) -> Result<i64, ValidationError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn positive(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::NotPositive { field, value });
    }
    u32::try_from(value).map_err(|_| ValidationError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}
