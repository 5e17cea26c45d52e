use crate::core::classifier::{PredictError, TextClassifier};
use thiserror::Error;

/// Confidence reported when the model cannot quantify its certainty
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

/// Errors raised while running a prediction
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Predict(#[from] PredictError),

    #[error("model returned no class probabilities")]
    EmptyProbabilities,

    #[error("model returned a non-finite probability")]
    InvalidProbability,
}

/// Label and rounded confidence for one text
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub category: String,
    pub confidence: f64,
}

/// Runs single-item predictions against a loaded model
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceEngine;

impl InferenceEngine {
    pub fn new() -> Self {
        Self
    }

    /// Classify already-validated text
    ///
    /// Confidence is the highest class probability when the model exposes
    /// one, `DEFAULT_CONFIDENCE` otherwise, rounded to 4 decimals.
    pub fn classify(
        &self,
        model: &dyn TextClassifier,
        text: &str,
    ) -> Result<Prediction, InferenceError> {
        let category = model.predict(text)?;

        let confidence = match model.confidence() {
            Some(estimator) => max_probability(&estimator.predict_proba(text)?)?,
            None => DEFAULT_CONFIDENCE,
        };

        Ok(Prediction {
            category,
            confidence: round4(confidence.clamp(0.0, 1.0)),
        })
    }
}

fn max_probability(proba: &[f64]) -> Result<f64, InferenceError> {
    if proba.is_empty() {
        return Err(InferenceError::EmptyProbabilities);
    }
    if proba.iter().any(|p| !p.is_finite()) {
        return Err(InferenceError::InvalidProbability);
    }

    Ok(proba.iter().cloned().fold(f64::NEG_INFINITY, f64::max))
}

/// Round to 4 decimal digits
#[inline]
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
