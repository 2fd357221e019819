//! Feature preprocessing: constant imputation followed by robust scaling.

use crate::data::{missing_columns, numeric_column, DataFrame};
use crate::errors::{Result, SensorflowError};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Value substituted for missing readings.
pub const IMPUTE_VALUE: f64 = 0.0;

/// Fitted preprocessing for the feature columns.
///
/// Missing values are replaced with [`IMPUTE_VALUE`], then each column is
/// centred on its median and divided by its inter-quartile range. A zero IQR
/// leaves the column unscaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTransformer {
    feature_names: Vec<String>,
    centers: Vec<f64>,
    scales: Vec<f64>,
}

impl FeatureTransformer {
    /// Fits on the named columns of `frame`.
    pub fn fit(frame: &DataFrame, feature_names: &[String]) -> Result<Self> {
        if feature_names.is_empty() {
            return Err(SensorflowError::model("no feature columns to fit"));
        }
        if frame.height() == 0 {
            return Err(SensorflowError::model("cannot fit a transformer on an empty frame"));
        }
        let imputed = imputed_matrix(frame, feature_names)?;

        let mut centers = Vec::with_capacity(feature_names.len());
        let mut scales = Vec::with_capacity(feature_names.len());
        for column in imputed.columns() {
            let mut sorted = column.to_vec();
            sorted.sort_by(f64::total_cmp);
            let median = quantile(&sorted, 0.5);
            let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);
            centers.push(median);
            scales.push(if iqr.abs() < f64::EPSILON { 1.0 } else { iqr });
        }

        Ok(Self {
            feature_names: feature_names.to_vec(),
            centers,
            scales,
        })
    }

    /// Columns the transformer was fitted on, in order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Transforms the fitted columns of `frame`. Extra columns are ignored.
    ///
    /// # Errors
    ///
    /// Fails if any fitted column is missing or holds text.
    pub fn transform(&self, frame: &DataFrame) -> Result<Array2<f64>> {
        let mut matrix = imputed_matrix(frame, &self.feature_names)?;
        for (mut column, (&center, &scale)) in matrix
            .columns_mut()
            .into_iter()
            .zip(self.centers.iter().zip(&self.scales))
        {
            column.mapv_inplace(|v| (v - center) / scale);
        }
        Ok(matrix)
    }
}

fn imputed_matrix(frame: &DataFrame, names: &[String]) -> Result<Array2<f64>> {
    let missing = missing_columns(frame, names);
    if !missing.is_empty() {
        return Err(SensorflowError::model(format!(
            "missing feature columns: {}",
            missing.join(", ")
        )));
    }

    let mut matrix = Array2::<f64>::zeros((frame.height(), names.len()));
    for (mut column, name) in matrix.columns_mut().into_iter().zip(names) {
        for (cell, value) in column.iter_mut().zip(numeric_column(frame, name)?) {
            *cell = value.unwrap_or(IMPUTE_VALUE);
        }
    }
    Ok(matrix)
}

/// Linear-interpolated quantile of sorted, non-empty data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
