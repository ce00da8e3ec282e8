// src/run_status.rs
//! Process-wide, single-slot state of the current (or last) scrape run.
//!
//! Lifecycle: `begin` resets the slot to "initializing", the owning
//! [`RunHandle`] reports progress, then exactly one of `complete` / `fail`
//! ends the run. Every mutation happens under one lock acquisition, so a
//! poller never sees a half-updated status.

use crate::mention_scan::PostRecord;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("Scraping is already in progress")]
    AlreadyRunning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub is_running: bool,
    pub progress: u8,
    pub message: String,
    pub results: Vec<PostRecord>,
    pub error: bool,
}

impl RunStatus {
    fn initializing() -> Self {
        Self {
            is_running: true,
            message: "Initializing scraper...".to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct RunSlot {
    status: Mutex<RunStatus>,
}

impl RunSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, RunStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the slot for a new run. Fails without touching the current
    /// state when a run is already in progress.
    pub fn begin(self: &Arc<Self>) -> Result<RunHandle, RunError> {
        let mut status = self.lock();
        if status.is_running {
            return Err(RunError::AlreadyRunning);
        }
        *status = RunStatus::initializing();

        Ok(RunHandle {
            slot: Arc::clone(self),
            finished: false,
        })
    }

    pub fn snapshot(&self) -> RunStatus {
        self.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_running
    }

    pub fn results(&self) -> Vec<PostRecord> {
        self.lock().results.clone()
    }
}

/// Write access to the slot for the run that claimed it.
#[derive(Debug)]
pub struct RunHandle {
    slot: Arc<RunSlot>,
    finished: bool,
}

impl RunHandle {
    pub fn progress(&self, percent: u8, message: &str) {
        let mut status = self.slot.lock();
        status.progress = percent.min(100);
        status.message = message.to_string();
    }

    pub fn complete(mut self, results: Vec<PostRecord>) {
        info!("Scraping complete! Found {} posts", results.len());
        let mut status = self.slot.lock();
        *status = RunStatus {
            is_running: false,
            progress: 100,
            message: format!("Scraping complete! Found {} posts", results.len()),
            results,
            error: false,
        };
        self.finished = true;
    }

    pub fn fail(mut self, message: &str) {
        self.mark_failed(message);
    }

    fn mark_failed(&mut self, message: &str) {
        error!("Scraping failed: {}", message);
        let mut status = self.slot.lock();
        *status = RunStatus {
            is_running: false,
            progress: 0,
            message: format!("Error: {}", message),
            results: Vec::new(),
            error: true,
        };
        self.finished = true;
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if !self.finished {
            self.mark_failed("run ended unexpectedly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record() -> PostRecord {
        PostRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 19).unwrap(),
            link: "https://www.linkedin.com/feed/update/1".to_string(),
            raw_time_text: "1d".to_string(),
            text: "hi".to_string(),
            emails: Vec::new(),
        }
    }

    #[test]
    fn test_begin_resets_to_initializing() {
        let slot = RunSlot::new();
        let handle = slot.begin().unwrap();

        let status = slot.snapshot();
        assert!(status.is_running);
        assert_eq!(status.progress, 0);
        assert_eq!(status.message, "Initializing scraper...");
        assert!(!status.error);
        handle.complete(Vec::new());
    }

    #[test]
    fn test_second_begin_is_rejected_without_reset() {
        let slot = RunSlot::new();
        let handle = slot.begin().unwrap();
        handle.progress(40, "Scroll 2/5");

        assert_eq!(slot.begin().unwrap_err(), RunError::AlreadyRunning);

        let status = slot.snapshot();
        assert!(status.is_running);
        assert_eq!(status.progress, 40);
        assert_eq!(status.message, "Scroll 2/5");
        handle.complete(Vec::new());
    }

    #[test]
    fn test_complete_publishes_results() {
        let slot = RunSlot::new();
        slot.begin().unwrap().complete(vec![record()]);

        let status = slot.snapshot();
        assert!(!status.is_running);
        assert_eq!(status.progress, 100);
        assert_eq!(status.message, "Scraping complete! Found 1 posts");
        assert_eq!(status.results, vec![record()]);
        assert!(slot.begin().is_ok());
    }

    #[test]
    fn test_fail_marks_error() {
        let slot = RunSlot::new();
        slot.begin().unwrap().fail("Login timeout");

        let status = slot.snapshot();
        assert!(!status.is_running);
        assert!(status.error);
        assert_eq!(status.progress, 0);
        assert_eq!(status.message, "Error: Login timeout");
    }

    #[test]
    fn test_dropped_handle_releases_slot() {
        let slot = RunSlot::new();
        drop(slot.begin().unwrap());

        assert!(!slot.is_running());
        assert!(slot.snapshot().error);
        assert!(slot.begin().is_ok());
    }

    #[test]
    fn test_status_json_shape() {
        let slot = RunSlot::new();
        slot.begin().unwrap().complete(vec![record()]);

        let value = serde_json::to_value(slot.snapshot()).unwrap();
        assert_eq!(value["is_running"], false);
        assert_eq!(value["progress"], 100);
        assert_eq!(value["error"], false);
        assert_eq!(value["results"][0]["Time Text"], "1d");
    }
}
