//! Rate model: encoding, fitting, evaluation and serving.
//!
//! - `encoder`: fixed-width feature vectors from records or queries
//! - `split`: seeded train / held-out partition
//! - `tree`, `forest`: CART trees and the bagged forest built from them
//! - `linear`: OLS baseline
//! - `trainer`: the training protocol and the persisted artifact
//! - `predict`: the prediction service over a loaded artifact

pub mod encoder;
pub mod forest;
pub mod linear;
pub mod predict;
pub mod split;
pub mod trainer;
pub mod tree;

pub use encoder::{FeatureEncoder, FeatureQuery};
pub use predict::PredictionService;
pub use trainer::{
    ARTIFACT_SCHEMA_VERSION, EvaluationMetrics, FeatureImportance, Regressor, TrainOutcome,
    TrainedModel, TrainingSettings, evaluate, train_model,
};
