//! Error types.
//!
//! `AppError` is the run-level error surfaced by the binary: a message plus the
//! process exit code. Stage-specific failures are typed enums that convert into it.
//!
//! Exit codes:
//! - 2: input / configuration / I/O problem
//! - 3: not enough data to continue
//! - 4: internal computation failure
//! - 5: model and vocabulary do not fit together

use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Why a single raw posting was rejected. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("unparseable posting: {0}")]
    Unparseable(String),

    #[error("missing specialty and state")]
    MissingIdentity,

    #[error("missing specialty")]
    MissingSpecialty,

    #[error("missing state")]
    MissingState,
}

/// Training-stage failures. Fatal to training only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainError {
    #[error("no records with an hourly rate remain ({total} records, all without a rate)")]
    NoRatedRecords { total: usize },

    #[error(
        "insufficient training data: {train} training rows (of {rated} rated records) is below the minimum of {minimum}"
    )]
    InsufficientTrainingData {
        rated: usize,
        train: usize,
        minimum: usize,
    },

    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error("model fit failed: {0}")]
    FitFailed(String),
}

/// Prediction-call failures. Fatal to that call only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("vocabulary mismatch: {0}")]
    VocabularyMismatch(String),

    #[error("model produced a non-finite estimate")]
    NonFinite,
}

impl From<TrainError> for AppError {
    fn from(err: TrainError) -> Self {
        let code = match err {
            TrainError::NoRatedRecords { .. } | TrainError::InsufficientTrainingData { .. } => 3,
            TrainError::InvalidConfig(_) => 2,
            TrainError::FitFailed(_) => 4,
        };
        AppError::new(code, format!("Training aborted: {err}"))
    }
}

impl From<PredictError> for AppError {
    fn from(err: PredictError) -> Self {
        let code = match err {
            PredictError::VocabularyMismatch(_) => 5,
            PredictError::NonFinite => 4,
        };
        AppError::new(code, format!("Prediction failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message_carries_counts() {
        let err: AppError = TrainError::InsufficientTrainingData {
            rated: 9,
            train: 7,
            minimum: 10,
        }
        .into();
        assert_eq!(err.exit_code(), 3);
        assert!(err.message().contains("7 training rows"));
        assert!(err.message().contains("minimum of 10"));
    }

    #[test]
    fn vocabulary_mismatch_has_its_own_exit_code() {
        let err: AppError = PredictError::VocabularyMismatch("unknown flag `x`".into()).into();
        assert_eq!(err.exit_code(), 5);
    }
}
