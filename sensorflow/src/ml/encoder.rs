//! Label encoding for the target column.

use crate::errors::{Result, SensorflowError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maps sorted distinct labels to `0..k`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEncoder {
    classes: Vec<String>,
}

impl TargetEncoder {
    /// Fits on the given labels. Null labels are rejected.
    pub fn fit(labels: &[Option<String>]) -> Result<Self> {
        let mut classes = BTreeSet::new();
        for (row, value) in labels.iter().enumerate() {
            let label = value
                .as_ref()
                .ok_or_else(|| SensorflowError::model(format!("missing target label at row {row}")))?;
            classes.insert(label.clone());
        }
        if classes.is_empty() {
            return Err(SensorflowError::model("cannot fit a target encoder without labels"));
        }
        Ok(Self {
            classes: classes.into_iter().collect(),
        })
    }

    /// Known classes, sorted.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Encodes labels. Labels unseen during fit are an error.
    pub fn transform(&self, labels: &[Option<String>]) -> Result<Vec<f64>> {
        labels
            .iter()
            .enumerate()
            .map(|(row, value)| {
                let label = value
                    .as_ref()
                    .ok_or_else(|| SensorflowError::model(format!("missing target label at row {row}")))?;
                self.classes
                    .binary_search(label)
                    .map(|idx| idx as f64)
                    .map_err(|_| SensorflowError::model(format!("unseen target label '{label}' at row {row}")))
            })
            .collect()
    }

    /// Decodes class indices back to labels. Non-finite codes are rejected.
    pub fn inverse_transform(&self, encoded: &[f64]) -> Result<Vec<String>> {
        encoded
            .iter()
            .map(|&code| {
                let idx = code.round();
                if !idx.is_finite() || idx < 0.0 {
                    return Err(SensorflowError::model(format!("class index {code} is out of range")));
                }
                self.classes
                    .get(idx as usize)
                    .cloned()
                    .ok_or_else(|| SensorflowError::model(format!("class index {code} is out of range")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(raw: &[&str]) -> Vec<Option<String>> {
        raw.iter()
            .map(|s| (!s.is_empty()).then(|| (*s).to_string()))
            .collect()
    }

    #[test]
    fn test_sorted_classes() {
        let encoder = TargetEncoder::fit(&labels(&["pos", "neg", "neg", "pos"])).unwrap();
        assert_eq!(encoder.classes(), &["neg", "pos"]);
        assert_eq!(encoder.transform(&labels(&["pos", "neg"])).unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_inverse_transform() {
        let encoder = TargetEncoder::fit(&labels(&["neg", "pos"])).unwrap();
        assert_eq!(encoder.inverse_transform(&[0.0, 1.0, 1.0]).unwrap(), vec!["neg", "pos", "pos"]);
        assert!(encoder.inverse_transform(&[2.0]).is_err());
    }

    #[test]
    fn test_non_finite_code_is_rejected() {
        let encoder = TargetEncoder::fit(&labels(&["neg", "pos"])).unwrap();
        for code in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -1.0] {
            let err = encoder.inverse_transform(&[code]).unwrap_err();
            assert!(err.to_string().contains("out of range"), "{code}: {err}");
        }
    }

    #[test]
    fn test_unseen_label_is_error() {
        let encoder = TargetEncoder::fit(&labels(&["neg", "pos"])).unwrap();
        let err = encoder.transform(&labels(&["maybe"])).unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_null_label_is_error() {
        assert!(TargetEncoder::fit(&labels(&["neg", ""])).is_err());
    }
}
