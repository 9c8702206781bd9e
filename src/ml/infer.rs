use std::cmp::Ordering;
use std::collections::BTreeMap;

use tract_onnx::prelude::*;

use crate::ml::{MlError, ModelBundle};

/// Clinical stages are the closed set {1, 2, 3, 4}.
pub const STAGE_COUNT: usize = 4;

/// Outcome of a single classifier invocation. `probabilities` is `None` when
/// the artifact only exposes a discrete label, never a vector of zeros.
#[derive(Debug, Clone)]
pub struct StagePrediction {
    pub stage: i32,
    pub probabilities: Option<Vec<f64>>,
}

impl ModelBundle {
    /// Run the classifier once over an already-coerced feature vector.
    ///
    /// The vector length is checked against the feature schema before the
    /// classifier is touched. A single stateless call, no retries.
    pub fn infer(&self, values: &[f64]) -> Result<StagePrediction, MlError> {
        check_feature_count(&self.feature_names, values.len())?;

        let row: Vec<f32> = values.iter().map(|v| *v as f32).collect();
        let input = tract_ndarray::Array2::from_shape_vec((1, row.len()), row)
            .map_err(|e| MlError::Inference(e.to_string()))?;

        let outputs = self
            .plan()
            .run(tvec!(Tensor::from(input).into()))
            .map_err(|e| MlError::Inference(e.to_string()))?;
        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| MlError::Inference("classifier produced no output".into()))?;

        if output.datum_type() == i64::datum_type() {
            // Label-only artifact: a single int64 class, no probabilities.
            let label = output
                .to_array_view::<i64>()
                .map_err(|e| MlError::Inference(e.to_string()))?
                .iter()
                .next()
                .copied()
                .ok_or_else(|| MlError::Inference("classifier output is empty".into()))?;
            Ok(StagePrediction {
                stage: validate_stage(label)?,
                probabilities: None,
            })
        } else {
            let probs: Vec<f64> = output
                .to_array_view::<f32>()
                .map_err(|e| MlError::Inference(e.to_string()))?
                .iter()
                .map(|p| f64::from(*p))
                .collect();
            if probs.len() != STAGE_COUNT {
                return Err(MlError::Inference(format!(
                    "expected {} class probabilities, got {}",
                    STAGE_COUNT,
                    probs.len()
                )));
            }
            let best = probs
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
                .map(|(i, _)| i)
                .ok_or_else(|| MlError::Inference("empty probability vector".into()))?;
            Ok(StagePrediction {
                stage: (best + 1) as i32,
                probabilities: Some(probs),
            })
        }
    }
}

/// Coerce raw JSON values into floats. Numbers pass through, numeric strings
/// are parsed, anything else is rejected with the offending index.
pub fn coerce_features(raw: &[serde_json::Value]) -> Result<Vec<f64>, MlError> {
    raw.iter()
        .enumerate()
        .map(|(index, value)| match value {
            serde_json::Value::Number(n) => {
                n.as_f64().ok_or(MlError::InvalidFeatureValue { index })
            }
            serde_json::Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| MlError::InvalidFeatureValue { index }),
            _ => Err(MlError::InvalidFeatureValue { index }),
        })
        .collect()
}

/// Build the `Stage_N` -> probability mapping, aligned by class index.
pub fn stage_probability_map(probs: &[f64]) -> BTreeMap<String, f64> {
    probs
        .iter()
        .enumerate()
        .map(|(i, p)| (format!("Stage_{}", i + 1), *p))
        .collect()
}

fn check_feature_count(names: &[String], got: usize) -> Result<(), MlError> {
    if got != names.len() {
        return Err(MlError::FeatureCountMismatch {
            expected: names.len(),
            got,
            names: names.to_vec(),
        });
    }
    Ok(())
}

fn validate_stage(label: i64) -> Result<i32, MlError> {
    if (1..=STAGE_COUNT as i64).contains(&label) {
        Ok(label as i32)
    } else {
        Err(MlError::Inference(format!(
            "classifier returned out-of-range stage {label}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn coerce_accepts_numbers_and_numeric_strings() {
        let raw = vec![json!(45), json!(2.3), json!("110"), json!(" 0.7 ")];
        let values = coerce_features(&raw).expect("coercion should succeed");
        assert_eq!(values, vec![45.0, 2.3, 110.0, 0.7]);
    }

    #[test]
    fn coerce_rejects_non_numeric_with_index() {
        let raw = vec![json!(1.0), json!("abc"), json!(2.0)];
        let err = coerce_features(&raw).unwrap_err();
        match err {
            MlError::InvalidFeatureValue { index } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn coerce_rejects_null_and_arrays() {
        assert!(coerce_features(&[json!(null)]).is_err());
        assert!(coerce_features(&[json!([1, 2])]).is_err());
        assert!(coerce_features(&[json!(true)]).is_err());
    }

    #[test]
    fn count_mismatch_names_the_expected_schema() {
        let err = check_feature_count(&names(3), 2).unwrap_err();
        match err {
            MlError::FeatureCountMismatch {
                expected,
                got,
                names,
            } => {
                assert_eq!(expected, 3);
                assert_eq!(got, 2);
                assert_eq!(names, vec!["f0", "f1", "f2"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn count_check_passes_on_exact_length() {
        assert!(check_feature_count(&names(5), 5).is_ok());
    }

    #[test]
    fn stage_validation_bounds() {
        assert_eq!(validate_stage(1).unwrap(), 1);
        assert_eq!(validate_stage(4).unwrap(), 4);
        assert!(validate_stage(0).is_err());
        assert!(validate_stage(5).is_err());
        assert!(validate_stage(-3).is_err());
    }

    #[test]
    fn probability_map_is_aligned_and_ordered() {
        let probs = [0.1, 0.2, 0.3, 0.4];
        let map = stage_probability_map(&probs);
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["Stage_1", "Stage_2", "Stage_3", "Stage_4"]);
        assert_eq!(map["Stage_4"], 0.4);
        let sum: f64 = map.values().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }
}
