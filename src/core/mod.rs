// Core request lifecycle exports
pub mod classifier;
pub mod handler;
pub mod inference;
pub mod validation;

pub use classifier::{decode_artifact, ConfidenceEstimator, SharedModel, TextClassifier};
pub use handler::{ClassificationHandler, ClassifyError, HandlerResponse, ResponseBody};
pub use inference::{InferenceEngine, InferenceError, Prediction};
pub use validation::{parse_request, ValidationError};
