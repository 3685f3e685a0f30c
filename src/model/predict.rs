//! Serving estimates from a trained artifact.

use tracing::debug;

use crate::error::PredictError;
use crate::model::encoder::FeatureQuery;
use crate::model::trainer::{ARTIFACT_SCHEMA_VERSION, TrainedModel};

/// Wraps a loaded artifact after checking the model and vocabulary agree.
#[derive(Debug, Clone)]
pub struct PredictionService {
    artifact: TrainedModel,
}

impl PredictionService {
    pub fn new(artifact: TrainedModel) -> Result<Self, PredictError> {
        if artifact.schema_version != ARTIFACT_SCHEMA_VERSION {
            return Err(PredictError::VocabularyMismatch(format!(
                "artifact schema version {} is not supported (expected {})",
                artifact.schema_version, ARTIFACT_SCHEMA_VERSION
            )));
        }
        let expected = artifact.encoder.width();
        let actual = artifact.model.input_width();
        if expected != actual {
            return Err(PredictError::VocabularyMismatch(format!(
                "model expects {actual} features but the vocabulary encodes {expected}"
            )));
        }
        Ok(Self { artifact })
    }

    pub fn artifact(&self) -> &TrainedModel {
        &self.artifact
    }

    /// Estimated hourly rate for one query.
    ///
    /// Unknown specialties, states and cities fall back to the vocabulary's unknown slot.
    /// Flags the model was not trained with are an error.
    pub fn predict(&self, query: &FeatureQuery) -> Result<f64, PredictError> {
        let encoder = &self.artifact.encoder;

        if let Some(unknown) = query.flags.keys().find(|k| !encoder.flags.contains(k)) {
            return Err(PredictError::VocabularyMismatch(format!(
                "flag `{unknown}` is not part of the model vocabulary (known: {})",
                encoder.flags.join(", ")
            )));
        }
        if !encoder.knows_specialty(&query.specialty) {
            debug!(specialty = %query.specialty, "unseen specialty, using unknown slot");
        }
        if !encoder.knows_state(&query.state) {
            debug!(state = %query.state, "unseen state, using unknown slot");
        }
        if let Some(city) = query.city.as_deref().filter(|c| !encoder.knows_city(c)) {
            debug!(city, "unseen city, using unknown slot");
        }

        let estimate = self.artifact.model.predict(&encoder.encode(query));
        if !estimate.is_finite() {
            return Err(PredictError::NonFinite);
        }
        Ok(estimate)
    }
}
