// src/core/mod.rs
//! Shared services used by both the CLI and the web control panel

pub mod config_manager;
pub mod scrape_job;

pub use config_manager::{ConfigManager, EnvironmentConfig};
pub use scrape_job::ScrapeJob;
