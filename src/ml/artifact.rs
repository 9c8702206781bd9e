use std::path::{Path, PathBuf};

use tract_onnx::prelude::*;
use tracing::info;

use crate::config::ModelConfig;
use crate::ml::MlError;

const MODEL_FILE: &str = "liver_model.onnx";
const FEATURES_FILE: &str = "feature_names.json";

/// The loaded classifier plus the ordered feature schema it was trained on.
/// Read-only after load; safe to share across requests behind an Arc.
pub struct ModelBundle {
    plan: TypedSimplePlan<TypedModel>,
    pub feature_names: Vec<String>,
    pub version: String,
}

impl ModelBundle {
    /// Load the serialized classifier and its feature-name list from disk.
    /// Fails with `ArtifactMissing` if either file is absent.
    pub fn load(config: &ModelConfig) -> Result<Self, MlError> {
        let model_path = Path::new(&config.dir).join(MODEL_FILE);
        let names_path = Path::new(&config.dir).join(FEATURES_FILE);

        if !model_path.exists() {
            return Err(MlError::ArtifactMissing { path: model_path });
        }
        if !names_path.exists() {
            return Err(MlError::ArtifactMissing { path: names_path });
        }

        let feature_names = read_feature_names(&names_path)?;

        let plan = tract_onnx::onnx()
            .model_for_path(&model_path)
            .map_err(|e| invalid(&model_path, e))?
            .with_input_fact(0, f32::fact([1, feature_names.len()]).into())
            .map_err(|e| invalid(&model_path, e))?
            .into_optimized()
            .map_err(|e| invalid(&model_path, e))?
            .into_runnable()
            .map_err(|e| invalid(&model_path, e))?;

        info!(
            model = %model_path.display(),
            features = feature_names.len(),
            version = %config.version,
            "model artifact loaded"
        );

        Ok(Self {
            plan,
            feature_names,
            version: config.version.clone(),
        })
    }

    pub(super) fn plan(&self) -> &TypedSimplePlan<TypedModel> {
        &self.plan
    }
}

fn read_feature_names(path: &PathBuf) -> Result<Vec<String>, MlError> {
    let raw = std::fs::read_to_string(path).map_err(|e| invalid(path, e))?;
    let names: Vec<String> = serde_json::from_str(&raw).map_err(|e| invalid(path, e))?;
    if names.is_empty() {
        return Err(MlError::ArtifactInvalid {
            path: path.clone(),
            reason: "feature name list is empty".into(),
        });
    }
    Ok(names)
}

fn invalid<E: std::fmt::Display>(path: &Path, e: E) -> MlError {
    MlError::ArtifactInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}
