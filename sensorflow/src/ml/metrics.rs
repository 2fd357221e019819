//! Scoring and distribution tests.

use serde::{Deserialize, Serialize};

/// Label treated as the positive class.
pub const POSITIVE_LABEL: f64 = 1.0;

const KS_EPS1: f64 = 0.001;
const KS_EPS2: f64 = 1.0e-8;
const KS_MAX_TERMS: u32 = 100;

/// Binary F1 score with [`POSITIVE_LABEL`] as the positive class.
///
/// Returns 0 when there are no positive labels and no positive predictions.
/// Extra trailing elements of the longer slice are ignored.
#[must_use]
pub fn f1_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let mut tp = 0_u64;
    let mut fp = 0_u64;
    let mut fn_ = 0_u64;
    for (&truth, &pred) in y_true.iter().zip(y_pred) {
        let actual = is_positive(truth);
        let predicted = is_positive(pred);
        match (actual, predicted) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    let denom = 2 * tp + fp + fn_;
    if denom == 0 {
        return 0.0;
    }
    (2 * tp) as f64 / denom as f64
}

fn is_positive(label: f64) -> bool {
    (label - POSITIVE_LABEL).abs() < f64::EPSILON
}

/// Result of a two-sample Kolmogorov–Smirnov test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsTestResult {
    /// Maximum distance between the empirical CDFs.
    pub statistic: f64,
    /// Asymptotic two-sided p-value.
    pub p_value: f64,
}

/// Two-sample Kolmogorov–Smirnov test.
///
/// Returns `None` if either sample is empty. NaNs must be filtered by the
/// caller.
#[must_use]
pub fn ks_2samp(a: &[f64], b: &[f64]) -> Option<KsTestResult> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n1, n2) = (a.len(), b.len());
    let (mut i, mut j) = (0, 0);
    let mut statistic: f64 = 0.0;
    while i < n1 && j < n2 {
        let x = a[i].min(b[j]);
        while i < n1 && a[i] <= x {
            i += 1;
        }
        while j < n2 && b[j] <= x {
            j += 1;
        }
        let gap = (i as f64 / n1 as f64 - j as f64 / n2 as f64).abs();
        statistic = statistic.max(gap);
    }

    let en = ((n1 * n2) as f64 / (n1 + n2) as f64).sqrt();
    let p_value = kolmogorov_q((en + 0.12 + 0.11 / en) * statistic).clamp(0.0, 1.0);
    Some(KsTestResult { statistic, p_value })
}

/// Survival function of the Kolmogorov distribution. Falls back to 1 when the
/// series does not converge, which happens for very small arguments.
fn kolmogorov_q(lambda: f64) -> f64 {
    let a2 = -2.0 * lambda * lambda;
    let mut sign = 2.0;
    let mut sum = 0.0;
    let mut previous = 0.0;
    for k in 1..=KS_MAX_TERMS {
        let k = f64::from(k);
        let term = sign * (a2 * k * k).exp();
        sum += term;
        if term.abs() <= KS_EPS1 * previous || term.abs() <= KS_EPS2 * sum {
            return sum;
        }
        sign = -sign;
        previous = term.abs();
    }
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_f1_perfect_and_empty() {
        assert_relative_eq!(f1_score(&[1.0, 0.0, 1.0], &[1.0, 0.0, 1.0]), 1.0);
        assert_relative_eq!(f1_score(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_f1_mixed() {
        // tp = 1, fp = 1, fn = 1
        let score = f1_score(&[1.0, 1.0, 0.0, 0.0], &[1.0, 0.0, 1.0, 0.0]);
        assert_relative_eq!(score, 0.5);
    }

    #[test]
    fn test_ks_identical_samples() {
        let sample: Vec<f64> = (0..50).map(f64::from).collect();
        let result = ks_2samp(&sample, &sample).unwrap();

        assert_relative_eq!(result.statistic, 0.0);
        assert_relative_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_ks_disjoint_samples() {
        let low: Vec<f64> = (0..100).map(f64::from).collect();
        let high: Vec<f64> = (1000..1100).map(f64::from).collect();
        let result = ks_2samp(&low, &high).unwrap();

        assert_relative_eq!(result.statistic, 1.0);
        assert!(result.p_value < 1e-10);
    }

    #[test]
    fn test_ks_shifted_samples() {
        let a: Vec<f64> = (0..200).map(|i| f64::from(i) / 10.0).collect();
        let b: Vec<f64> = (0..200).map(|i| f64::from(i) / 10.0 + 5.0).collect();
        let result = ks_2samp(&a, &b).unwrap();

        assert_relative_eq!(result.statistic, 0.25, epsilon = 0.01);
        assert!(result.p_value < 0.05);
    }

    #[test]
    fn test_ks_empty_sample() {
        assert!(ks_2samp(&[], &[1.0]).is_none());
    }
}
