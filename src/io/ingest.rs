//! Raw JSONL ingest.
//!
//! The scraper writes one JSON object per line, either to a single file or into a
//! directory of dated snapshots:
//!
//! ```text
//! raw/
//!   2025-06-01/jobs.jsonl
//!   2025-06-08/jobs.jsonl   <- latest snapshot wins
//! ```
//!
//! Design goals:
//! - **Row-level tolerance**: a malformed line is reported, never fatal
//! - **Line numbers** carried through so rejections can be traced back
//! - **No cleaning logic here**: values are passed on as the scraper wrote them

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::RawPosting;
use crate::error::AppError;

/// File name expected inside each snapshot directory.
pub const SNAPSHOT_FILE: &str = "jobs.jsonl";

/// A line that could not be read as a posting.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: parsed postings with their source line numbers.
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub source: PathBuf,
    pub postings: Vec<RawPosting>,
    /// `lines[i]` is the 1-based line of `postings[i]`.
    pub lines: Vec<usize>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Resolve `path` to a JSONL file (a file as-is, or the latest snapshot in a directory).
pub fn resolve_raw_path(path: &Path) -> Result<PathBuf, AppError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if !path.is_dir() {
        return Err(AppError::new(
            2,
            format!("Raw input '{}' does not exist.", path.display()),
        ));
    }

    let entries = fs::read_dir(path)
        .map_err(|e| AppError::new(2, format!("Failed to list '{}': {e}", path.display())))?;

    let mut snapshots: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path().join(SNAPSHOT_FILE))
        .filter(|candidate| candidate.is_file())
        .collect();
    snapshots.sort();

    snapshots.pop().ok_or_else(|| {
        AppError::new(
            2,
            format!(
                "No snapshot with a `{SNAPSHOT_FILE}` found under '{}'.",
                path.display()
            ),
        )
    })
}

/// Load raw postings from a JSONL file or snapshot directory.
pub fn load_raw_postings(path: &Path) -> Result<RawBatch, AppError> {
    let source = resolve_raw_path(path)?;
    let file = File::open(&source)
        .map_err(|e| AppError::new(2, format!("Failed to open '{}': {e}", source.display())))?;

    let mut postings = Vec::new();
    let mut lines = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_no = idx + 1;
        let text = line.map_err(|e| {
            AppError::new(
                2,
                format!("Failed to read '{}' at line {line_no}: {e}", source.display()),
            )
        })?;

        let text = text.trim().trim_start_matches('\u{feff}');
        if text.is_empty() {
            continue;
        }
        rows_read += 1;

        match serde_json::from_str::<RawPosting>(text) {
            Ok(posting) => {
                postings.push(posting);
                lines.push(line_no);
            }
            Err(e) => row_errors.push(RowError {
                line: line_no,
                message: format!("invalid JSON: {e}"),
            }),
        }
    }

    if !row_errors.is_empty() {
        warn!(count = row_errors.len(), "unreadable lines in raw input");
    }
    info!(
        source = %source.display(),
        rows_read,
        parsed = postings.len(),
        "loaded raw postings"
    );

    Ok(RawBatch {
        source,
        postings,
        lines,
        row_errors,
        rows_read,
    })
}

/// Write postings as JSONL (one object per line).
pub fn write_raw_postings(path: &Path, postings: &[RawPosting]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", parent.display())))?;
    }
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    for posting in postings {
        serde_json::to_writer(&mut out, posting)
            .map_err(|e| AppError::new(2, format!("Failed to write posting: {e}")))?;
        out.write_all(b"\n")
            .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))?;
    }
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush '{}': {e}", path.display())))?;

    info!(path = %path.display(), postings = postings.len(), "wrote raw postings");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_scraper_field_names_and_keeps_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.jsonl");
        let mut f = File::create(&path).unwrap();
        writeln!(
            f,
            r#"{{"Id":"J1","SpecialtyName":"Hospitalist","StateName":"Ohio","RegularHR":175.0}}"#
        )
        .unwrap();
        writeln!(f).unwrap();
        writeln!(f, "{{not json").unwrap();
        writeln!(f, r#"{{"job_id":"J2","specialty":"Radiology","state":"Texas"}}"#).unwrap();
        drop(f);

        let batch = load_raw_postings(&path).unwrap();
        assert_eq!(batch.rows_read, 3);
        assert_eq!(batch.postings.len(), 2);
        assert_eq!(batch.lines, vec![1, 4]);
        assert_eq!(batch.postings[0].structured_rate, Some(175.0));
        assert_eq!(batch.postings[1].specialty.as_deref(), Some("Radiology"));
        assert_eq!(batch.row_errors.len(), 1);
        assert_eq!(batch.row_errors[0].line, 3);
    }

    #[test]
    fn scraper_lines_with_naive_timestamps_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.jsonl");
        let mut f = File::create(&path).unwrap();
        for ts in ["2025-06-01T12:34:56.789012", "2025-06-02T08:00:00"] {
            writeln!(
                f,
                r#"{{"Id":12345,"JobIdStrnew":"hospitalist-12345","Title":"Nocturnist","SpecialtyName":"Hospitalist","StateName":"Ohio","RegularHR":0,"CreartedOn":"2025-05-20T00:00:00","scrape_timestamp_utc":"{ts}"}}"#
            )
            .unwrap();
        }
        drop(f);

        let batch = load_raw_postings(&path).unwrap();
        assert!(batch.row_errors.is_empty());
        assert_eq!(batch.postings.len(), 2);
        assert_eq!(batch.postings[0].job_id.as_deref(), Some("12345"));
        assert!(batch.postings[0].scraped_at < batch.postings[1].scraped_at);
        assert_eq!(crate::clean::dedup::surviving_indices(&batch.postings), vec![1]);
    }

    #[test]
    fn picks_the_latest_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        for day in ["2025-06-01", "2025-06-08", "2025-06-15"] {
            fs::create_dir(dir.path().join(day)).unwrap();
        }
        // The newest directory has no jobs file yet.
        fs::write(dir.path().join("2025-06-01").join(SNAPSHOT_FILE), "").unwrap();
        fs::write(dir.path().join("2025-06-08").join(SNAPSHOT_FILE), "").unwrap();

        let resolved = resolve_raw_path(dir.path()).unwrap();
        assert!(resolved.ends_with("2025-06-08/jobs.jsonl"));
    }

    #[test]
    fn written_postings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw").join("jobs.jsonl");
        let postings = vec![
            RawPosting {
                job_id: Some("A".to_string()),
                specialty: Some("Psychiatry".to_string()),
                ..RawPosting::default()
            },
            RawPosting::default(),
        ];
        write_raw_postings(&path, &postings).unwrap();

        let batch = load_raw_postings(&path).unwrap();
        assert_eq!(batch.postings, postings);
        assert!(batch.row_errors.is_empty());
    }

    #[test]
    fn missing_input_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_raw_postings(&dir.path().join("nope.jsonl")).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = resolve_raw_path(dir.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
