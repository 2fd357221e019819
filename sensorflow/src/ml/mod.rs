//! Machine-learning primitives used by the pipeline stages.
//!
//! This module provides:
//! - [`FeatureTransformer`] and [`TargetEncoder`] for preprocessing
//! - [`Classifier`] and its [`LogisticRegression`] implementation
//! - F1 scoring and the two-sample Kolmogorov–Smirnov test
//! - bincode persistence of fitted objects

mod classifier;
mod encoder;
mod metrics;
mod persist;
mod transformer;

pub use classifier::{Classifier, ClassifierParams, LogisticRegression};
pub use encoder::TargetEncoder;
pub use metrics::{f1_score, ks_2samp, KsTestResult, POSITIVE_LABEL};
pub use persist::{load_object, save_object};
pub use transformer::{FeatureTransformer, IMPUTE_VALUE};
