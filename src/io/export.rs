//! Export report tables to CSV (one file per grouping) plus an overview JSON.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::{GroupKey, GroupStatistic};
use crate::error::AppError;
use crate::report::Reports;

const GROUPINGS: [GroupKey; 4] = [
    GroupKey::Specialty,
    GroupKey::State,
    GroupKey::Region,
    GroupKey::Month,
];

/// File name of the table for one grouping, e.g. `rates_by_state.csv`.
pub fn table_file_name(key: GroupKey) -> String {
    format!("rates_by_{}.csv", key.label())
}

/// Write every report table into `dir`. Returns the files written.
pub fn write_report_tables(dir: &Path, reports: &Reports) -> Result<Vec<PathBuf>, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;

    let mut written = Vec::with_capacity(GROUPINGS.len() + 1);
    for key in GROUPINGS {
        let path = dir.join(table_file_name(key));
        write_group_table(&path, reports.table(key), key == GroupKey::Region)?;
        written.push(path);
    }

    let overview = dir.join("overview.json");
    let file = File::create(&overview)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", overview.display())))?;
    serde_json::to_writer_pretty(file, &reports.overall)
        .map_err(|e| AppError::new(2, format!("Failed to write overview JSON: {e}")))?;
    written.push(overview);

    info!(dir = %dir.display(), files = written.len(), "wrote report tables");
    Ok(written)
}

/// Write one grouping as `key,median_rate,sample_count,low_confidence[,state_count]`.
pub fn write_group_table(path: &Path, rows: &[GroupStatistic], with_state_count: bool) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let mut header = vec!["key", "median_rate", "sample_count", "low_confidence"];
    if with_state_count {
        header.push("state_count");
    }
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for row in rows {
        let mut cells = vec![
            row.key.clone(),
            row.median_rate.map(|v| format!("{v:.2}")).unwrap_or_default(),
            row.sample_count.to_string(),
            row.low_confidence.to_string(),
        ];
        if with_state_count {
            cells.push(row.state_count.unwrap_or(0).to_string());
        }
        writer
            .write_record(&cells)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}
