//! Shared pipeline logic used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! raw ingest -> clean -> dataset CSV -> reports -> train -> artifact -> predict
//!
//! The CLI handlers then only deal with presentation (printing).

use std::path::{Path, PathBuf};

use tracing::info;

use crate::clean::{CleanOutput, clean_postings};
use crate::domain::{CleanConfig, ReportConfig, TrainConfig};
use crate::error::AppError;
use crate::extract::KeywordTable;
use crate::io::{
    load_raw_postings, read_dataset_csv, read_model_json, write_dataset_csv, write_model_json,
    write_report_tables,
};
use crate::model::{FeatureQuery, PredictionService, TrainOutcome, train_model};
use crate::report::{Reports, build_reports};

/// File names inside an output directory.
pub const DATASET_FILE: &str = "cleaned.csv";
pub const MODEL_FILE: &str = "model.json";

/// Everything the cleaning stage needs.
#[derive(Debug, Clone)]
pub struct CleanJob {
    pub raw: PathBuf,
    pub keywords: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub clean: CleanConfig,
    pub report: ReportConfig,
}

/// Outputs of a cleaning run.
#[derive(Debug, Clone)]
pub struct CleanRun {
    pub source: PathBuf,
    pub rows_read: usize,
    pub unreadable: usize,
    pub output: CleanOutput,
    pub reports: Reports,
    pub dataset_path: PathBuf,
    pub table_paths: Vec<PathBuf>,
}

/// Ingest, clean, and write the dataset plus report tables.
pub fn run_clean(job: &CleanJob) -> Result<CleanRun, AppError> {
    let keywords = match &job.keywords {
        Some(path) => KeywordTable::from_json_file(path)?,
        None => KeywordTable::default(),
    };
    info!(flags = keywords.len(), "keyword table ready");

    let batch = load_raw_postings(&job.raw)?;
    let output = clean_postings(&batch.postings, &batch.lines, &keywords, &job.clean);

    std::fs::create_dir_all(&job.out_dir)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", job.out_dir.display())))?;
    let dataset_path = job.out_dir.join(DATASET_FILE);
    write_dataset_csv(&dataset_path, &output.records)?;

    let reports = build_reports(&output.records, &job.report);
    let table_paths = write_report_tables(&job.out_dir, &reports)?;

    Ok(CleanRun {
        source: batch.source,
        rows_read: batch.rows_read,
        unreadable: batch.row_errors.len(),
        output,
        reports,
        dataset_path,
        table_paths,
    })
}

/// Recompute the reports of a cleaned dataset, optionally exporting the tables.
pub fn run_report(
    dataset: &Path,
    config: &ReportConfig,
    export_dir: Option<&Path>,
) -> Result<(Reports, Vec<PathBuf>), AppError> {
    let records = read_dataset_csv(dataset)?;
    let reports = build_reports(&records, config);
    let written = match export_dir {
        Some(dir) => write_report_tables(dir, &reports)?,
        None => Vec::new(),
    };
    Ok((reports, written))
}

/// Train on a cleaned dataset and persist the artifact.
pub fn run_train(dataset: &Path, config: &TrainConfig, model_out: &Path) -> Result<TrainOutcome, AppError> {
    let records = read_dataset_csv(dataset)?;
    let outcome = train_model(&records, config)?;
    write_model_json(model_out, &outcome.model)?;
    Ok(outcome)
}

/// Load an artifact and estimate one hourly rate. Returns the estimate and model version.
pub fn run_predict(model: &Path, query: &FeatureQuery) -> Result<(f64, String), AppError> {
    let artifact = read_model_json(model)?;
    let service = PredictionService::new(artifact)?;
    let estimate = service.predict(query)?;
    Ok((estimate, service.artifact().version.clone()))
}

/// Outputs of `locum run`.
#[derive(Debug, Clone)]
pub struct FullRun {
    pub clean: CleanRun,
    pub train: TrainOutcome,
    pub model_path: PathBuf,
}

/// Clean, report and train in one pass. Training reads the dataset just written,
/// so `run` and `clean` followed by `train` produce the same model.
pub fn run_all(job: &CleanJob, train: &TrainConfig) -> Result<FullRun, AppError> {
    let clean = run_clean(job)?;
    let model_path = job.out_dir.join(MODEL_FILE);
    let outcome = run_train(&clean.dataset_path, train, &model_path)?;
    Ok(FullRun {
        clean,
        train: outcome,
        model_path,
    })
}
