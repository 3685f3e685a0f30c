//! Read/write model artifact JSON.
//!
//! The artifact is the portable representation of a trained model:
//! - regressor parameters (forest nodes or OLS coefficients)
//! - the encoder vocabulary the parameters are only valid against
//! - held-out metrics, feature importances and training settings
//!
//! The schema is defined by `model::TrainedModel`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::AppError;
use crate::model::TrainedModel;

/// Write an artifact. The file is written and synced beside the target, then
/// renamed into place, so a reader never sees a half-written model and a failed
/// write leaves the previous artifact untouched.
pub fn write_model_json(path: &Path, model: &TrainedModel) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", parent.display())))?;
    }

    let tmp = path.with_extension("json.tmp");
    if let Err(err) = write_synced(&tmp, model) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    fs::rename(&tmp, path)
        .map_err(|e| AppError::new(2, format!("Failed to move model JSON into '{}': {e}", path.display())))?;

    info!(path = %path.display(), version = %model.version, "wrote model artifact");
    Ok(())
}

fn write_synced(tmp: &Path, model: &TrainedModel) -> Result<(), AppError> {
    let file = File::create(tmp)
        .map_err(|e| AppError::new(2, format!("Failed to create model JSON '{}': {e}", tmp.display())))?;
    let file = write_json(BufWriter::new(file), model)?;
    file.sync_all()
        .map_err(|e| AppError::new(2, format!("Failed to sync model JSON '{}': {e}", tmp.display())))
}

/// Serialize and flush. Buffered write errors surface here instead of being lost on drop.
fn write_json<W: Write>(mut writer: BufWriter<W>, model: &TrainedModel) -> Result<W, AppError> {
    serde_json::to_writer(&mut writer, model)
        .map_err(|e| AppError::new(2, format!("Failed to write model JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush model JSON: {e}")))?;
    writer
        .into_inner()
        .map_err(|e| AppError::new(2, format!("Failed to flush model JSON: {}", e.error())))
}

/// Read an artifact.
pub fn read_model_json(path: &Path) -> Result<TrainedModel, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open model JSON '{}': {e}", path.display())))?;
    let model: TrainedModel = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid model JSON '{}': {e}", path.display())))?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TrainConfig;
    use crate::model::trainer::tests::synthetic_records;
    use crate::model::{FeatureQuery, PredictionService, train_model};

    fn small_model() -> TrainedModel {
        let config = TrainConfig {
            n_trees: 5,
            ..TrainConfig::default()
        };
        train_model(&synthetic_records(40), &config).unwrap().model
    }

    /// Accepts nothing, like a full disk.
    #[derive(Debug)]
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn reloaded_artifact_predicts_identically() {
        let config = TrainConfig {
            n_trees: 10,
            ..TrainConfig::default()
        };
        let model = train_model(&synthetic_records(60), &config).unwrap().model;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("rate_model.json");
        write_model_json(&path, &model).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = read_model_json(&path).unwrap();
        assert_eq!(loaded.encoder, model.encoder);
        assert_eq!(loaded.version, model.version);

        let query = FeatureQuery {
            specialty: "Hospitalist".to_string(),
            state: "Ohio".to_string(),
            ..FeatureQuery::default()
        };
        let before = PredictionService::new(model).unwrap().predict(&query).unwrap();
        let after = PredictionService::new(loaded).unwrap().predict(&query).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn buffered_write_errors_are_reported() {
        // Large enough that serialization only fills the buffer and the failure comes from the flush.
        let writer = BufWriter::with_capacity(1 << 24, FullDisk);
        let err = write_json(writer, &small_model()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("flush"), "{}", err.message());
    }

    #[test]
    fn failed_write_keeps_the_previous_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let first = small_model();
        write_model_json(&path, &first).unwrap();

        // A directory squatting on the temp path makes the next write fail.
        fs::create_dir(path.with_extension("json.tmp")).unwrap();
        let mut second = first.clone();
        second.version = "other".to_string();
        assert_eq!(write_model_json(&path, &second).unwrap_err().exit_code(), 2);

        assert_eq!(read_model_json(&path).unwrap().version, first.version);
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        fs::write(&path, "{\"schema_version\": 1}").unwrap();
        assert_eq!(read_model_json(&path).unwrap_err().exit_code(), 2);
    }
}
