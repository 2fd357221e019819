//! Binary classifiers.

use crate::errors::{Result, SensorflowError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A fitted-in-place binary classifier over 0/1 labels.
pub trait Classifier: Send + Sync {
    /// Fits on features `x` and labels `y`.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predicts 0/1 labels.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Hyper-parameters for [`LogisticRegression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    /// Gradient step size.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Maximum gradient steps.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// L2 penalty strength.
    #[serde(default = "default_l2")]
    pub l2: f64,
    /// Stop once every gradient component is below this.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Weight classes inversely to their frequency.
    #[serde(default = "default_balanced")]
    pub balanced: bool,
}

fn default_learning_rate() -> f64 {
    0.5
}

fn default_max_iter() -> usize {
    1000
}

fn default_l2() -> f64 {
    1e-4
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_balanced() -> bool {
    true
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            max_iter: default_max_iter(),
            l2: default_l2(),
            tolerance: default_tolerance(),
            balanced: default_balanced(),
        }
    }
}

impl ClassifierParams {
    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0) {
            return Err(SensorflowError::config("classifier.learning_rate must be positive"));
        }
        if self.max_iter == 0 {
            return Err(SensorflowError::config("classifier.max_iter must be at least 1"));
        }
        if !(self.l2 >= 0.0) || !(self.tolerance >= 0.0) {
            return Err(SensorflowError::config(
                "classifier.l2 and classifier.tolerance must be non-negative",
            ));
        }
        Ok(())
    }
}

/// L2-regularised logistic regression trained by full-batch gradient descent.
///
/// Training is deterministic: weights start at zero and every step uses the
/// whole data set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    params: ClassifierParams,
    weights: Option<Array1<f64>>,
    bias: f64,
    iterations: usize,
}

impl LogisticRegression {
    /// Creates an unfitted model.
    #[must_use]
    pub const fn new(params: ClassifierParams) -> Self {
        Self {
            params,
            weights: None,
            bias: 0.0,
            iterations: 0,
        }
    }

    /// Returns true once fitted.
    #[must_use]
    pub const fn is_fitted(&self) -> bool {
        self.weights.is_some()
    }

    /// Gradient steps taken by the last fit.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Probability of the positive class for each row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let weights = self
            .weights
            .as_ref()
            .ok_or_else(|| SensorflowError::model("classifier is not fitted"))?;
        if x.ncols() != weights.len() {
            return Err(SensorflowError::model(format!(
                "expected {} features, got {}",
                weights.len(),
                x.ncols()
            )));
        }
        Ok((x.dot(weights) + self.bias).mapv(sigmoid))
    }

    fn sample_weights(&self, y: &Array1<f64>) -> Array1<f64> {
        if !self.params.balanced {
            return Array1::ones(y.len());
        }
        let n = y.len() as f64;
        let positives = y.iter().filter(|&&v| v > 0.5).count() as f64;
        let negatives = n - positives;
        let weight = |count: f64| if count > 0.0 { n / (2.0 * count) } else { 0.0 };
        let (w_pos, w_neg) = (weight(positives), weight(negatives));
        y.mapv(|v| if v > 0.5 { w_pos } else { w_neg })
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(ClassifierParams::default())
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(SensorflowError::model("cannot fit on an empty feature matrix"));
        }
        if x.nrows() != y.len() {
            return Err(SensorflowError::model(format!(
                "feature rows ({}) and labels ({}) differ",
                x.nrows(),
                y.len()
            )));
        }
        if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
            return Err(SensorflowError::model(format!(
                "binary classifier expects 0/1 labels, found {bad}"
            )));
        }

        let sample_weights = self.sample_weights(y);
        let total_weight = sample_weights.sum();
        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;
        let mut iterations = 0;

        for step in 1..=self.params.max_iter {
            iterations = step;
            let proba = (x.dot(&weights) + bias).mapv(sigmoid);
            let residual = (proba - y) * &sample_weights;
            let grad_w = x.t().dot(&residual) / total_weight + &weights * self.params.l2;
            let grad_b = residual.sum() / total_weight;

            weights.scaled_add(-self.params.learning_rate, &grad_w);
            bias -= self.params.learning_rate * grad_b;

            let largest = grad_w.iter().fold(grad_b.abs(), |acc, g| acc.max(g.abs()));
            if largest < self.params.tolerance {
                break;
            }
        }

        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(SensorflowError::model("gradient descent diverged"));
        }
        self.weights = Some(weights);
        self.bias = bias;
        self.iterations = iterations;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_proba(x)?.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![[-2.0, -1.0], [-1.5, -1.2], [-1.0, -0.5], [1.0, 0.8], [1.5, 1.1], [2.0, 1.4]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_fits_separable_data() {
        let (x, y) = separable();
        let mut model = LogisticRegression::default();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        assert!(model.iterations() > 0);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = separable();
        let mut a = LogisticRegression::default();
        let mut b = LogisticRegression::default();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let (x, _) = separable();
        assert!(LogisticRegression::default().predict(&x).is_err());
    }

    #[test]
    fn test_rejects_non_binary_labels() {
        let (x, _) = separable();
        let y = array![0.0, 1.0, 2.0, 0.0, 1.0, 0.0];
        assert!(LogisticRegression::default().fit(&x, &y).is_err());
    }

    #[test]
    fn test_feature_count_mismatch() {
        let (x, y) = separable();
        let mut model = LogisticRegression::default();
        model.fit(&x, &y).unwrap();
        assert!(model.predict(&array![[1.0, 2.0, 3.0]]).is_err());
    }

    #[test]
    fn test_params_validation() {
        let params = ClassifierParams {
            learning_rate: 0.0,
            ..ClassifierParams::default()
        };
        assert!(params.validate().is_err());
        ClassifierParams::default().validate().unwrap();
    }
}
