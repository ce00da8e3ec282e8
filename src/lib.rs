pub mod config;
pub mod core;
pub mod export;
pub mod mention_scan;
pub mod run_status;
pub mod utils;
pub mod web;

pub use config::{ScrapeParameters, ValidationError};
pub use mention_scan::PostRecord;
pub use run_status::{RunError, RunSlot, RunStatus};
pub use web::start_web_server;
