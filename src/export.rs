// src/export.rs
use crate::mention_scan::{PostRecord, EXPORT_COLUMNS};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use rust_xlsxwriter::{Format, Workbook};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

/// `linkedin_scrape_YYYYMMDD_HHMMSS.<ext>`
pub fn export_file_name(at: DateTime<Local>, format: ExportFormat) -> String {
    format!(
        "linkedin_scrape_{}.{}",
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Spreadsheet with one header row and one row per record.
pub fn xlsx_bytes(records: &[PostRecord]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (col, title) in EXPORT_COLUMNS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *title, &header)
            .context("Failed to write header row")?;
    }

    for (row, record) in records.iter().enumerate() {
        for (col, value) in record.to_row().iter().enumerate() {
            worksheet
                .write_string(row as u32 + 1, col as u16, value)
                .with_context(|| format!("Failed to write row {}", row + 1))?;
        }
    }

    workbook
        .save_to_buffer()
        .context("Failed to serialize spreadsheet")
}

pub fn csv_bytes(records: &[PostRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(EXPORT_COLUMNS)
        .context("Failed to write CSV header")?;
    for record in records {
        writer
            .write_record(record.to_row())
            .context("Failed to write CSV row")?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))
}

pub fn export_bytes(records: &[PostRecord], format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Xlsx => xlsx_bytes(records),
        ExportFormat::Csv => csv_bytes(records),
    }
}

/// Write `records` into `dir` under a timestamped name and return the path.
pub async fn write_export(
    dir: &Path,
    records: &[PostRecord],
    format: ExportFormat,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let path = dir.join(export_file_name(Local::now(), format));
    let bytes = export_bytes(records, format)?;
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write file: {}", path.display()))?;

    info!("Exported {} posts to {}", records.len(), path.display());
    Ok(path)
}
