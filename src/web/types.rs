// src/web/types.rs

use crate::config::{
    parse_number, ScrapeParameters, ValidationError, DEFAULT_RECENCY_WINDOW_DAYS,
    DEFAULT_SCROLL_ITERATIONS,
};
use crate::export::ExportFormat;
use crate::mention_scan::SessionConfig;
use crate::run_status::RunSlot;
use rocket::http::{ContentType, Status};
use rocket::response::status::Custom;
use rocket::response::{self, Responder};
use rocket::serde::json::{Json, Value};
use rocket::serde::{Deserialize, Serialize};
use rocket::{Request, Response};
use std::path::PathBuf;
use std::sync::Arc;

pub type ApiError = Custom<Json<ErrorResponse>>;

/// Exported sheet sent as a download.
pub struct ExportResponse {
    pub data: Vec<u8>,
    pub filename: String,
    pub format: ExportFormat,
}

impl<'r> Responder<'r, 'static> for ExportResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let content_type = match self.format {
            ExportFormat::Xlsx => ContentType::new(
                "application",
                "vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            ExportFormat::Csv => ContentType::CSV,
        };

        Response::build()
            .header(content_type)
            .raw_header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", self.filename),
            )
            .sized_body(self.data.len(), std::io::Cursor::new(self.data))
            .ok()
    }
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, error_code: &str) -> Self {
        Self {
            success: false,
            error: error.into(),
            error_code: error_code.to_string(),
        }
    }

    pub fn with_status(self, status: Status) -> ApiError {
        Custom(status, Json(self))
    }
}

impl From<ValidationError> for ErrorResponse {
    fn from(e: ValidationError) -> Self {
        let code = match e {
            ValidationError::EmptyMention => "MISSING_COMPANY_NAME",
            ValidationError::NotPositive { .. } => "NOT_POSITIVE",
            ValidationError::InvalidNumber { .. } => "INVALID_NUMBER",
        };
        Self::new(e.to_string(), code)
    }
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

/// Body of `POST /api/start_scraping`. Numbers may be sent as JSON numbers
/// or numeric strings.
#[derive(Debug, Default, Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct StartScrapingRequest {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub days_filter: Option<Value>,
    #[serde(default)]
    pub scroll_count: Option<Value>,
}

impl StartScrapingRequest {
    pub fn to_parameters(&self) -> Result<ScrapeParameters, ValidationError> {
        if self.company_name.trim().is_empty() {
            return Err(ValidationError::EmptyMention);
        }
        ScrapeParameters::new(
            &self.company_name,
            number_field(
                "Days filter",
                self.days_filter.as_ref(),
                DEFAULT_RECENCY_WINDOW_DAYS,
            )?,
            number_field(
                "Scroll count",
                self.scroll_count.as_ref(),
                DEFAULT_SCROLL_ITERATIONS,
            )?,
        )
    }
}

fn number_field(
    field: &'static str,
    value: Option<&Value>,
    default: u32,
) -> Result<i64, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(i64::from(default)),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| ValidationError::InvalidNumber {
            field,
            value: n.to_string(),
        }),
        Some(Value::String(s)) => parse_number(field, s),
        Some(other) => Err(ValidationError::InvalidNumber {
            field,
            value: other.to_string(),
        }),
    }
}

/// Shared state of the control panel.
pub struct ServerConfig {
    pub slot: Arc<RunSlot>,
    pub export_dir: PathBuf,
    pub snapshot_dir: PathBuf,
    pub session: SessionConfig,
}
