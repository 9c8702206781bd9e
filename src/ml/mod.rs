use std::path::PathBuf;

use thiserror::Error;

mod artifact;
mod infer;

pub use artifact::ModelBundle;
pub use infer::{coerce_features, stage_probability_map, StagePrediction, STAGE_COUNT};

/// Failures in the artifact-loading and inference path. Every variant is a
/// client-visible 400: inference cannot proceed, but the process stays up.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("model artifact not found at {path}")]
    ArtifactMissing { path: PathBuf },

    #[error("model artifact at {path} is unreadable: {reason}")]
    ArtifactInvalid { path: PathBuf, reason: String },

    #[error("expected {expected} features in order {names:?}, but got {got}")]
    FeatureCountMismatch {
        expected: usize,
        got: usize,
        names: Vec<String>,
    },

    #[error("feature at index {index} is not a number")]
    InvalidFeatureValue { index: usize },

    #[error("inference failed: {0}")]
    Inference(String),
}
