use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::predict::repo::Prediction;

/// Body of POST /predict: an ordered feature vector. Values may arrive as
/// numbers or numeric strings; coercion happens before inference.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predicted_stage: i32,
    /// Per-class probabilities keyed `Stage_1`..`Stage_4`; null when the
    /// classifier exposes no probabilities.
    pub probabilities: Option<BTreeMap<String, f64>>,
    pub record: Prediction,
}

#[derive(Debug, Serialize)]
pub struct FeatureNamesResponse {
    pub features: Vec<String>,
}
