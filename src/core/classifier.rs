//! Model abstraction and the serialized artifact format.
//!
//! An artifact is a JSON document tagged by `kind`. Decoding validates the
//! shapes once so prediction never has to bounds-check against a
//! malformed model.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while decoding a model artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Invalid artifact encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Invalid model shape: {0}")]
    Shape(String),
}

/// Errors raised by a model during prediction
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Numerical error: {0}")]
    Numerical(String),
}

/// A fitted classifier able to label one text at a time
pub trait TextClassifier: Send + Sync + fmt::Debug {
    /// Predict the label for a single text
    fn predict(&self, text: &str) -> Result<String, PredictError>;

    /// Confidence capability, if the model can quantify its certainty
    fn confidence(&self) -> Option<&dyn ConfidenceEstimator> {
        None
    }

    /// Class labels known to the model
    fn classes(&self) -> Vec<String>;
}

/// Optional capability: per-class probabilities for a single text
pub trait ConfidenceEstimator {
    fn predict_proba(&self, text: &str) -> Result<Vec<f64>, PredictError>;
}

/// Model shared read-only across requests
pub type SharedModel = Arc<dyn TextClassifier>;

/// Serialized model artifact
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ModelArtifact {
    TfidfLogistic(TfidfLogisticArtifact),
    Keyword(KeywordArtifact),
}

#[derive(Debug, Deserialize)]
struct TfidfLogisticArtifact {
    classes: Vec<String>,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    #[serde(default = "default_true")]
    lowercase: bool,
    #[serde(default)]
    sublinear_tf: bool,
}

#[derive(Debug, Deserialize)]
struct KeywordArtifact {
    rules: Vec<KeywordRule>,
    default_label: String,
}

#[derive(Debug, Clone, Deserialize)]
struct KeywordRule {
    label: String,
    keywords: Vec<String>,
}

fn default_true() -> bool { true }

/// Decode raw artifact bytes into a ready-to-use model
pub fn decode_artifact(bytes: &[u8]) -> Result<SharedModel, ArtifactError> {
    let artifact: ModelArtifact = serde_json::from_slice(bytes)?;

    let model: SharedModel = match artifact {
        ModelArtifact::TfidfLogistic(a) => Arc::new(LinearTextModel::try_from(a)?),
        ModelArtifact::Keyword(a) => Arc::new(KeywordModel::try_from(a)?),
    };

    Ok(model)
}

/// Split text into word tokens of at least two characters
///
/// A token is a run of alphanumeric characters or underscores.
pub fn tokenize(text: &str, lowercase: bool) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(|token| {
            if lowercase {
                token.to_lowercase()
            } else {
                token.to_string()
            }
        })
        .collect()
}

/// TF-IDF features followed by a multinomial logistic regression
#[derive(Debug)]
pub struct LinearTextModel {
    classes: Vec<String>,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    lowercase: bool,
    sublinear_tf: bool,
}

impl TryFrom<TfidfLogisticArtifact> for LinearTextModel {
    type Error = ArtifactError;

    fn try_from(a: TfidfLogisticArtifact) -> Result<Self, Self::Error> {
        let n_features = a.idf.len();

        if a.classes.len() < 2 {
            return Err(ArtifactError::Shape(format!(
                "expected at least 2 classes, got {}",
                a.classes.len()
            )));
        }
        if a.classes.iter().any(|c| c.is_empty()) {
            return Err(ArtifactError::Shape("class labels must be non-empty".into()));
        }
        if a.coef.len() != a.classes.len() || a.intercept.len() != a.classes.len() {
            return Err(ArtifactError::Shape(format!(
                "{} classes but {} coefficient rows and {} intercepts",
                a.classes.len(),
                a.coef.len(),
                a.intercept.len()
            )));
        }
        if let Some(row) = a.coef.iter().find(|row| row.len() != n_features) {
            return Err(ArtifactError::Shape(format!(
                "coefficient row has {} columns, idf has {}",
                row.len(),
                n_features
            )));
        }
        if let Some((term, col)) = a.vocabulary.iter().find(|(_, col)| **col >= n_features) {
            return Err(ArtifactError::Shape(format!(
                "term '{}' maps to column {} of {}",
                term, col, n_features
            )));
        }

        Ok(Self {
            classes: a.classes,
            vocabulary: a.vocabulary,
            idf: a.idf,
            coef: a.coef,
            intercept: a.intercept,
            lowercase: a.lowercase,
            sublinear_tf: a.sublinear_tf,
        })
    }
}

impl LinearTextModel {
    /// Sparse, L2-normalised TF-IDF vector as (column, weight) pairs
    fn features(&self, text: &str) -> Vec<(usize, f64)> {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokenize(text, self.lowercase) {
            if let Some(&col) = self.vocabulary.get(&token) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }

        let mut weights: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(col, tf)| {
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (col, tf * self.idf[col])
            })
            .collect();

        let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut weights {
                *w /= norm;
            }
        }

        weights
    }

    fn logits(&self, text: &str) -> Result<Vec<f64>, PredictError> {
        let features = self.features(text);

        let logits: Vec<f64> = self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, bias)| bias + features.iter().map(|&(col, w)| row[col] * w).sum::<f64>())
            .collect();

        if logits.iter().any(|z| !z.is_finite()) {
            return Err(PredictError::Numerical("non-finite decision value".into()));
        }

        Ok(logits)
    }
}

impl TextClassifier for LinearTextModel {
    fn predict(&self, text: &str) -> Result<String, PredictError> {
        let logits = self.logits(text)?;

        // Ties resolve to the earliest class
        let best = logits
            .iter()
            .enumerate()
            .fold(0, |best, (i, z)| if *z > logits[best] { i } else { best });

        Ok(self.classes[best].clone())
    }

    fn confidence(&self) -> Option<&dyn ConfidenceEstimator> {
        Some(self)
    }

    fn classes(&self) -> Vec<String> {
        self.classes.clone()
    }
}

impl ConfidenceEstimator for LinearTextModel {
    fn predict_proba(&self, text: &str) -> Result<Vec<f64>, PredictError> {
        let logits = self.logits(text)?;

        // Shift by the max logit for a stable softmax
        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
        let total: f64 = exps.iter().sum();

        if !total.is_finite() || total <= 0.0 {
            return Err(PredictError::Numerical("softmax normaliser is not positive".into()));
        }

        Ok(exps.into_iter().map(|e| e / total).collect())
    }
}

/// Keyword-vote classifier without a probability estimate
#[derive(Debug)]
pub struct KeywordModel {
    rules: Vec<KeywordRule>,
    default_label: String,
}

impl TryFrom<KeywordArtifact> for KeywordModel {
    type Error = ArtifactError;

    fn try_from(a: KeywordArtifact) -> Result<Self, Self::Error> {
        if a.default_label.is_empty() || a.rules.iter().any(|r| r.label.is_empty()) {
            return Err(ArtifactError::Shape("rule labels must be non-empty".into()));
        }

        let rules = a
            .rules
            .into_iter()
            .map(|rule| KeywordRule {
                label: rule.label,
                keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
            })
            .collect();

        Ok(Self {
            rules,
            default_label: a.default_label,
        })
    }
}

impl TextClassifier for KeywordModel {
    fn predict(&self, text: &str) -> Result<String, PredictError> {
        let tokens = tokenize(text, true);

        let mut best: Option<(&str, usize)> = None;
        for rule in &self.rules {
            let hits = tokens.iter().filter(|t| rule.keywords.contains(t)).count();
            if hits > 0 && best.map_or(true, |(_, most)| hits > most) {
                best = Some((&rule.label, hits));
            }
        }

        Ok(best
            .map(|(label, _)| label)
            .unwrap_or(self.default_label.as_str())
            .to_string())
    }

    fn classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = self.rules.iter().map(|r| r.label.clone()).collect();
        if !classes.contains(&self.default_label) {
            classes.push(self.default_label.clone());
        }
        classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_class_artifact() -> String {
        serde_json::json!({
            "kind": "tfidf_logistic",
            "classes": ["sci.med", "rec.sport.baseball"],
            "vocabulary": {"doctor": 0, "pitcher": 1, "game": 2},
            "idf": [2.0, 2.0, 1.5],
            "coef": [[3.0, -1.0, 0.0], [-1.0, 3.0, 1.0]],
            "intercept": [0.0, 0.0]
        })
        .to_string()
    }

    #[test]
    fn test_tokenize_drops_short_tokens_and_punctuation() {
        let tokens = tokenize("A GPU, a card & rendering_engine!", true);
        assert_eq!(tokens, vec!["gpu", "card", "rendering_engine"]);
    }

    #[test]
    fn test_tokenize_keeps_case_when_asked() {
        assert_eq!(tokenize("Hello World", false), vec!["Hello", "World"]);
    }

    #[test]
    fn test_linear_model_predicts_and_estimates() {
        let model = decode_artifact(two_class_artifact().as_bytes()).unwrap();

        assert_eq!(model.predict("The doctor saw me").unwrap(), "sci.med");
        assert_eq!(model.predict("The pitcher won the game").unwrap(), "rec.sport.baseball");

        let proba = model.confidence().unwrap().predict_proba("doctor doctor").unwrap();
        assert_eq!(proba.len(), 2);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(proba[0] > proba[1]);
    }

    #[test]
    fn test_unknown_words_fall_back_to_intercept() {
        let model = decode_artifact(two_class_artifact().as_bytes()).unwrap();
        let proba = model.confidence().unwrap().predict_proba("zzz qqq").unwrap();
        assert!((proba[0] - 0.5).abs() < 1e-9);
        assert_eq!(model.predict("zzz qqq").unwrap(), "sci.med");
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let artifact = serde_json::json!({
            "kind": "tfidf_logistic",
            "classes": ["a", "b"],
            "vocabulary": {"x": 0},
            "idf": [1.0],
            "coef": [[1.0], [1.0, 2.0]],
            "intercept": [0.0, 0.0]
        });
        let err = decode_artifact(artifact.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, ArtifactError::Shape(_)));
    }

    #[test]
    fn test_vocabulary_out_of_range_rejected() {
        let artifact = serde_json::json!({
            "kind": "tfidf_logistic",
            "classes": ["a", "b"],
            "vocabulary": {"x": 5},
            "idf": [1.0],
            "coef": [[1.0], [2.0]],
            "intercept": [0.0, 0.0]
        });
        assert!(matches!(
            decode_artifact(artifact.to_string().as_bytes()),
            Err(ArtifactError::Shape(_))
        ));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        assert!(matches!(
            decode_artifact(b"\x80\x04\x95 not json"),
            Err(ArtifactError::Encoding(_))
        ));
        assert!(matches!(
            decode_artifact(br#"{"kind": "random_forest"}"#),
            Err(ArtifactError::Encoding(_))
        ));
    }

    #[test]
    fn test_keyword_model_votes() {
        let artifact = serde_json::json!({
            "kind": "keyword",
            "rules": [
                {"label": "comp.graphics", "keywords": ["GPU", "rendering", "pixel"]},
                {"label": "sci.med", "keywords": ["doctor", "fever"]}
            ],
            "default_label": "misc"
        });
        let model = decode_artifact(artifact.to_string().as_bytes()).unwrap();

        assert!(model.confidence().is_none());
        assert_eq!(model.predict("The GPU is rendering pixels").unwrap(), "comp.graphics");
        assert_eq!(model.predict("Doctor, I have a fever").unwrap(), "sci.med");
        assert_eq!(model.predict("Nothing relevant here").unwrap(), "misc");
        assert_eq!(model.classes(), vec!["comp.graphics", "sci.med", "misc"]);
    }

    #[test]
    fn test_keyword_model_falls_back_without_tokens() {
        let artifact = serde_json::json!({
            "kind": "keyword",
            "rules": [],
            "default_label": "misc"
        });
        let model = decode_artifact(artifact.to_string().as_bytes()).unwrap();
        assert_eq!(model.predict("! ? . , ;").unwrap(), "misc");
    }
}
