//! Model training and evaluation.
//!
//! Protocol:
//! 1. keep records with an hourly rate (others are reporting-only)
//! 2. split them with a seeded shuffle (same input + seed => same split)
//! 3. fit the vocabulary and the regressor on the training partition
//! 4. score the held-out partition (MAE, RMSE, R²)
//! 5. bundle model + vocabulary + metrics into one versioned artifact

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{CleanedRecord, ModelKind, TrainConfig};
use crate::error::TrainError;
use crate::model::encoder::FeatureEncoder;
use crate::model::forest::{ForestParams, RandomForest};
use crate::model::linear::LinearModel;
use crate::model::split::{Partition, split_indices};
use crate::model::tree::TreeParams;

/// Bumped whenever the artifact layout changes incompatibly.
pub const ARTIFACT_SCHEMA_VERSION: u32 = 2;

/// Fitted regression parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Regressor {
    Forest(RandomForest),
    Linear(LinearModel),
}

impl Regressor {
    pub fn kind(&self) -> ModelKind {
        match self {
            Regressor::Forest(_) => ModelKind::Forest,
            Regressor::Linear(_) => ModelKind::Linear,
        }
    }

    /// Feature vector length the regressor was fitted on.
    pub fn input_width(&self) -> usize {
        match self {
            Regressor::Forest(f) => f.n_features,
            Regressor::Linear(l) => l.n_features(),
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        match self {
            Regressor::Forest(f) => f.predict(row),
            Regressor::Linear(l) => l.predict(row),
        }
    }
}

/// Held-out error statistics. Metrics are `None` when nothing was held out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub n_train: usize,
    pub n_test: usize,
    pub mae: Option<f64>,
    pub rmse: Option<f64>,
    pub r2: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Settings the model was trained with (kept for provenance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    pub seed: u64,
    pub test_fraction: f64,
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
}

/// The persisted artifact: a model is only valid together with its vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub schema_version: u32,
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub encoder: FeatureEncoder,
    pub model: Regressor,
    pub metrics: EvaluationMetrics,
    /// Sorted by importance, descending. Empty for linear models.
    pub importances: Vec<FeatureImportance>,
    pub settings: TrainingSettings,
}

/// Training result: the artifact plus what is needed to inspect the run.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model: TrainedModel,
    /// Indices into the rated records (input order, null-rate records skipped).
    pub partition: Partition,
    /// `(actual, predicted)` for each held-out record.
    pub holdout: Vec<(f64, f64)>,
}

/// Train and evaluate a model over cleaned records.
pub fn train_model(records: &[CleanedRecord], config: &TrainConfig) -> Result<TrainOutcome, TrainError> {
    validate_config(config)?;

    let rated: Vec<&CleanedRecord> = records.iter().filter(|r| r.rate_hourly.is_some()).collect();
    if rated.is_empty() {
        return Err(TrainError::NoRatedRecords { total: records.len() });
    }

    let partition = split_indices(rated.len(), config.test_fraction, config.seed);
    if partition.train.len() < config.min_train_samples.max(1) {
        return Err(TrainError::InsufficientTrainingData {
            rated: rated.len(),
            train: partition.train.len(),
            minimum: config.min_train_samples.max(1),
        });
    }

    let train: Vec<&CleanedRecord> = partition.train.iter().map(|&i| rated[i]).collect();
    let test: Vec<&CleanedRecord> = partition.test.iter().map(|&i| rated[i]).collect();

    let flag_names: BTreeSet<&String> = rated.iter().flat_map(|r| r.flags.keys()).collect();
    let encoder = FeatureEncoder::fit(&train, flag_names.into_iter().cloned().collect());

    let x_train: Vec<Vec<f64>> = train.iter().map(|r| encoder.encode_record(r)).collect();
    let y_train: Vec<f64> = train.iter().filter_map(|r| r.rate_hourly).collect();

    info!(
        model = config.model_kind.display_name(),
        train = train.len(),
        test = test.len(),
        features = encoder.width(),
        "training model"
    );

    let (model, importances) = fit_regressor(&x_train, &y_train, config)?;
    let importances = name_importances(&encoder, importances);

    let holdout: Vec<(f64, f64)> = test
        .iter()
        .filter_map(|r| {
            let actual = r.rate_hourly?;
            Some((actual, model.predict(&encoder.encode_record(r))))
        })
        .collect();
    if holdout.iter().any(|(_, p)| !p.is_finite()) {
        return Err(TrainError::FitFailed("non-finite prediction on held-out data".into()));
    }

    let metrics = evaluate(train.len(), &holdout);
    info!(
        mae = metrics.mae,
        rmse = metrics.rmse,
        r2 = metrics.r2,
        "held-out evaluation"
    );

    let trained_at = Utc::now();
    let artifact = TrainedModel {
        schema_version: ARTIFACT_SCHEMA_VERSION,
        version: format!("{}-seed{}", trained_at.format("%Y%m%dT%H%M%SZ"), config.seed),
        trained_at,
        encoder,
        model,
        metrics,
        importances,
        settings: TrainingSettings {
            seed: config.seed,
            test_fraction: config.test_fraction,
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features,
        },
    };

    Ok(TrainOutcome {
        model: artifact,
        partition,
        holdout,
    })
}

fn validate_config(config: &TrainConfig) -> Result<(), TrainError> {
    if !(0.0..1.0).contains(&config.test_fraction) {
        return Err(TrainError::InvalidConfig(format!(
            "test fraction must be in [0, 1), got {}",
            config.test_fraction
        )));
    }
    if config.model_kind == ModelKind::Forest {
        if config.n_trees == 0 {
            return Err(TrainError::InvalidConfig("forest needs at least one tree".into()));
        }
        if config.max_depth == 0 {
            return Err(TrainError::InvalidConfig("max depth must be > 0".into()));
        }
        if config.max_features == Some(0) {
            return Err(TrainError::InvalidConfig("max features must be > 0".into()));
        }
    }
    Ok(())
}

fn fit_regressor(
    x: &[Vec<f64>],
    y: &[f64],
    config: &TrainConfig,
) -> Result<(Regressor, Vec<f64>), TrainError> {
    match config.model_kind {
        ModelKind::Forest => {
            let params = ForestParams {
                n_trees: config.n_trees,
                tree: TreeParams {
                    max_depth: config.max_depth,
                    min_samples_leaf: config.min_samples_leaf.max(1),
                    max_features: config.max_features.unwrap_or(usize::MAX),
                },
                seed: config.seed,
            };
            let (forest, importances) = RandomForest::fit(x, y, &params);
            Ok((Regressor::Forest(forest), importances))
        }
        ModelKind::Linear => {
            let linear = LinearModel::fit(x, y)
                .ok_or_else(|| TrainError::FitFailed("least squares solve failed".into()))?;
            Ok((Regressor::Linear(linear), Vec::new()))
        }
    }
}

fn name_importances(encoder: &FeatureEncoder, importances: Vec<f64>) -> Vec<FeatureImportance> {
    let mut named: Vec<FeatureImportance> = encoder
        .feature_names()
        .into_iter()
        .zip(importances)
        .map(|(feature, importance)| FeatureImportance { feature, importance })
        .collect();
    named.sort_by(|a, b| {
        b.importance
            .total_cmp(&a.importance)
            .then_with(|| a.feature.cmp(&b.feature))
    });
    named
}

/// MAE, RMSE and R² over `(actual, predicted)` pairs.
pub fn evaluate(n_train: usize, holdout: &[(f64, f64)]) -> EvaluationMetrics {
    let n = holdout.len();
    if n == 0 {
        return EvaluationMetrics {
            n_train,
            n_test: 0,
            mae: None,
            rmse: None,
            r2: None,
        };
    }

    let nf = n as f64;
    let mae = holdout.iter().map(|(a, p)| (a - p).abs()).sum::<f64>() / nf;
    let ss_res: f64 = holdout.iter().map(|(a, p)| (a - p).powi(2)).sum();
    let mean = holdout.iter().map(|(a, _)| a).sum::<f64>() / nf;
    let ss_tot: f64 = holdout.iter().map(|(a, _)| (a - mean).powi(2)).sum();

    // A constant target has no variance to explain: perfect fit scores 1, anything else 0.
    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    EvaluationMetrics {
        n_train,
        n_test: n,
        mae: Some(mae),
        rmse: Some((ss_res / nf).sqrt()),
        r2: Some(r2),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clean::region_for_state;
    use crate::domain::FeatureFlags;

    /// Records whose rate is driven by specialty, state and one flag.
    pub(crate) fn synthetic_records(n: usize) -> Vec<CleanedRecord> {
        let specialties = ["Anesthesiology", "Emergency Medicine", "Hospitalist"];
        let states = ["Texas", "Ohio", "California"];
        (0..n)
            .map(|i| {
                let specialty = specialties[i % 3];
                let state = states[(i / 3) % 3];
                let trauma = i % 4 == 0;
                let rate = match specialty {
                    "Anesthesiology" => 300.0,
                    "Emergency Medicine" => 220.0,
                    _ => 150.0,
                } + if state == "California" { 25.0 } else { 0.0 }
                    + if trauma { 15.0 } else { 0.0 };
                let rate = if i % 10 == 9 { None } else { Some(rate) };
                let flags: FeatureFlags = [
                    ("acls_required".to_string(), i % 2 == 0),
                    ("trauma_center".to_string(), trauma),
                ]
                .into_iter()
                .collect();
                CleanedRecord {
                    job_id: Some(format!("J{i}")),
                    title: None,
                    specialty: specialty.to_string(),
                    state: state.to_string(),
                    city: Some(
                        match state {
                            "Texas" => "Houston",
                            "Ohio" => "Columbus",
                            _ => "Fresno",
                        }
                        .to_string(),
                    ),
                    region: region_for_state(state),
                    start_date: None,
                    end_date: None,
                    duration_days: Some(7 + (i as i64 % 5) * 7),
                    rate_hourly: rate,
                    rate_daily: rate.map(|r| r * 8.0),
                    flags,
                }
            })
            .collect()
    }

    fn small_forest() -> TrainConfig {
        TrainConfig {
            n_trees: 25,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn training_is_deterministic() {
        let records = synthetic_records(80);
        let a = train_model(&records, &small_forest()).unwrap();
        let b = train_model(&records, &small_forest()).unwrap();

        assert_eq!(a.partition, b.partition);
        assert_eq!(a.model.metrics, b.model.metrics);
        assert_eq!(a.model.model, b.model.model);
        assert_eq!(a.holdout, b.holdout);
    }

    #[test]
    fn null_rates_are_excluded() {
        let records = synthetic_records(80);
        let rated = records.iter().filter(|r| r.rate_hourly.is_some()).count();
        let out = train_model(&records, &small_forest()).unwrap();
        let m = &out.model.metrics;
        assert_eq!(m.n_train + m.n_test, rated);
        assert_eq!(m.n_test, (rated as f64 * 0.2).ceil() as usize);
    }

    #[test]
    fn forest_learns_the_signal() {
        let out = train_model(&synthetic_records(120), &small_forest()).unwrap();
        let m = &out.model.metrics;
        assert!(m.mae.unwrap() < 20.0, "mae too high: {:?}", m.mae);
        assert!(m.r2.unwrap() > 0.8, "r2 too low: {:?}", m.r2);
        assert_eq!(out.model.importances.len(), out.model.encoder.width());
        assert!(out.model.importances[0].feature.starts_with("specialty="));
    }

    #[test]
    fn linear_model_trains_too() {
        let config = TrainConfig {
            model_kind: ModelKind::Linear,
            ..TrainConfig::default()
        };
        let out = train_model(&synthetic_records(120), &config).unwrap();
        assert_eq!(out.model.model.kind(), ModelKind::Linear);
        assert!(out.model.importances.is_empty());
        assert!(out.model.metrics.mae.unwrap() < 5.0);
    }

    #[test]
    fn all_null_rates_abort_training() {
        let mut records = synthetic_records(20);
        for r in &mut records {
            r.rate_hourly = None;
            r.rate_daily = None;
        }
        assert_eq!(
            train_model(&records, &small_forest()).unwrap_err(),
            TrainError::NoRatedRecords { total: 20 }
        );
    }

    #[test]
    fn too_few_training_rows_abort_with_counts() {
        let records = synthetic_records(10);
        let err = train_model(&records, &small_forest()).unwrap_err();
        assert_eq!(
            err,
            TrainError::InsufficientTrainingData {
                rated: 9,
                train: 7,
                minimum: 10
            }
        );
    }

    #[test]
    fn bad_config_is_rejected() {
        let config = TrainConfig {
            test_fraction: 1.0,
            ..TrainConfig::default()
        };
        assert!(matches!(
            train_model(&synthetic_records(50), &config),
            Err(TrainError::InvalidConfig(_))
        ));
    }

    #[test]
    fn r2_handles_constant_targets() {
        assert_eq!(evaluate(5, &[(100.0, 100.0), (100.0, 100.0)]).r2, Some(1.0));
        assert_eq!(evaluate(5, &[(100.0, 90.0), (100.0, 110.0)]).r2, Some(0.0));
        let m = evaluate(5, &[]);
        assert_eq!(m.mae, None);
        assert_eq!(m.n_test, 0);
    }
}
