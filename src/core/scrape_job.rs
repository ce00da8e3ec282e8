// src/core/scrape_job.rs
use crate::config::ScrapeParameters;
use crate::mention_scan::{PostRecord, ScrapeSession, SessionConfig, SnapshotBrowser};
use crate::run_status::RunHandle;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::info;

/// One scrape run over the page snapshots in `snapshot_dir`.
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    pub params: ScrapeParameters,
    pub snapshot_dir: PathBuf,
    pub session: SessionConfig,
}

impl ScrapeJob {
    pub fn new(params: ScrapeParameters, snapshot_dir: PathBuf, session: SessionConfig) -> Self {
        Self {
            params,
            snapshot_dir,
            session,
        }
    }

    /// Blocking: open the browser, run the session, return the records.
    pub fn execute(&self, progress: &mut dyn FnMut(u8, &str)) -> Result<Vec<PostRecord>> {
        info!(
            "Starting scrape for @{} (last {} days, {} scrolls)",
            self.params.target_mention(),
            self.params.recency_window_days(),
            self.params.scroll_iterations()
        );

        let browser = SnapshotBrowser::from_dir(&self.snapshot_dir)
            .context("Failed to start browser")?;

        ScrapeSession::new(browser, self.params.clone(), self.session.clone()).run(progress)
    }

    /// Blocking: execute and publish the outcome through `handle`.
    pub fn run_tracked(&self, handle: RunHandle) {
        match self.execute(&mut |percent, message| handle.progress(percent, message)) {
            Ok(records) => handle.complete(records),
            Err(e) => handle.fail(&format!("{:#}", e)),
        }
    }

    /// Run on the blocking pool so the server keeps answering status polls.
    pub fn spawn(self, handle: RunHandle) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || self.run_tracked(handle))
    }
}
