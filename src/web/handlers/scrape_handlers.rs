// src/web/handlers/scrape_handlers.rs
use crate::core::ScrapeJob;
use crate::export::{write_export, ExportFormat};
use crate::run_status::{RunError, RunStatus};
use crate::web::types::*;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info, warn};

pub async fn start_scraping_handler(
    request: Json<StartScrapingRequest>,
    config: &State<ServerConfig>,
) -> Result<Json<ActionResponse>, ApiError> {
    // a running job wins over request validation
    if config.slot.is_running() {
        return Err(conflict());
    }

    let params = request.to_parameters().map_err(|e| {
        warn!("Rejected scrape request: {}", e);
        ErrorResponse::from(e).with_status(Status::BadRequest)
    })?;

    let handle = config.slot.begin().map_err(|e| match e {
        RunError::AlreadyRunning => conflict(),
    })?;

    info!("Scraping started for @{}", params.target_mention());
    let job = ScrapeJob::new(params, config.snapshot_dir.clone(), config.session.clone());
    // detached; the handle reports the outcome to the slot
    let _ = job.spawn(handle);

    Ok(Json(ActionResponse {
        success: true,
        message: "Scraping started".to_string(),
    }))
}

pub async fn scraping_status_handler(config: &State<ServerConfig>) -> Json<RunStatus> {
    Json(config.slot.snapshot())
}

pub async fn export_results_handler(
    format: Option<&str>,
    config: &State<ServerConfig>,
) -> Result<ExportResponse, ApiError> {
    let format = match format {
        None | Some("xlsx") => ExportFormat::Xlsx,
        Some("csv") => ExportFormat::Csv,
        Some(other) => {
            return Err(ErrorResponse::new(
                format!("Unsupported export format: {}", other),
                "INVALID_FORMAT",
            )
            .with_status(Status::BadRequest))
        }
    };

    let results = config.slot.results();
    if results.is_empty() {
        return Err(ErrorResponse::new("No results to export", "NO_RESULTS")
            .with_status(Status::BadRequest));
    }

    let path = write_export(&config.export_dir, &results, format)
        .await
        .map_err(export_failed)?;
    let data = tokio::fs::read(&path)
        .await
        .map_err(|e| export_failed(e.into()))?;

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("linkedin_scrape.xlsx")
        .to_string();

    Ok(ExportResponse {
        data,
        filename,
        format,
    })
}

fn conflict() -> ApiError {
    ErrorResponse::new(RunError::AlreadyRunning.to_string(), "ALREADY_RUNNING")
        .with_status(Status::Conflict)
}

fn export_failed(e: anyhow::Error) -> ApiError {
    error!("Export failed: {:#}", e);
    ErrorResponse::new(format!("Export failed: {}", e), "EXPORT_FAILED")
        .with_status(Status::InternalServerError)
}
