//! Synthetic sensor data and pre-built environments for tests.

use crate::config::{Schema, Settings, MODEL_FILE_NAME, TARGET_ENCODER_OBJECT_FILE_NAME, TRANSFORMER_OBJECT_FILE_NAME};
use crate::data::{label_column, take_rows, DataFrame};
use crate::errors::Result;
use crate::ml::{save_object, Classifier, FeatureTransformer, LogisticRegression, TargetEncoder};
use crate::registry::{ModelVersion, VersionCounter};
use ndarray::Array1;
use polars::prelude::{NamedFrom, Series};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

/// Label column used by the synthetic data.
pub const TARGET_COLUMN: &str = "class";
/// Negative class label.
pub const NEGATIVE_LABEL: &str = "neg";
/// Positive class label.
pub const POSITIVE_LABEL: &str = "pos";

/// Builds frames shaped like the sensor export: a `class` column of
/// `neg`/`pos` labels followed by numeric sensor columns. Missing readings
/// are nulls.
#[derive(Debug, Clone)]
pub struct SensorFrameBuilder {
    rows: usize,
    features: usize,
    positive_rate: f64,
    separation: f64,
    missing_rate: f64,
    empty_columns: Vec<String>,
    with_id: bool,
    seed: u64,
}

impl Default for SensorFrameBuilder {
    fn default() -> Self {
        Self {
            rows: 200,
            features: 4,
            positive_rate: 0.3,
            separation: 3.0,
            missing_rate: 0.0,
            empty_columns: Vec::new(),
            with_id: false,
            seed: 7,
        }
    }
}

impl SensorFrameBuilder {
    /// Creates a builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    /// Number of sensor columns.
    #[must_use]
    pub const fn features(mut self, features: usize) -> Self {
        self.features = features;
        self
    }

    /// Share of positive rows, spread evenly.
    #[must_use]
    pub const fn positive_rate(mut self, rate: f64) -> Self {
        self.positive_rate = rate;
        self
    }

    /// Offset added to positive rows' readings. Zero makes classes
    /// indistinguishable.
    #[must_use]
    pub const fn separation(mut self, separation: f64) -> Self {
        self.separation = separation;
        self
    }

    /// Share of sensor cells left missing.
    #[must_use]
    pub const fn missing_rate(mut self, rate: f64) -> Self {
        self.missing_rate = rate;
        self
    }

    /// Adds a sensor column with every reading missing.
    #[must_use]
    pub fn empty_column(mut self, name: impl Into<String>) -> Self {
        self.empty_columns.push(name.into());
        self
    }

    /// Adds a leading `_id` column like a document store export.
    #[must_use]
    pub const fn with_id(mut self) -> Self {
        self.with_id = true;
        self
    }

    /// RNG seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sensor column names this builder produces, in order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        (0..self.features).map(sensor_column_name).collect()
    }

    /// Builds the frame.
    pub fn build(&self) -> Result<DataFrame> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let labels: Vec<bool> = (0..self.rows)
            .map(|i| {
                let before = (i as f64 * self.positive_rate).floor();
                let after = ((i + 1) as f64 * self.positive_rate).floor();
                after > before
            })
            .collect();

        let mut columns = Vec::new();
        if self.with_id {
            let ids: Vec<String> = (0..self.rows).map(|i| format!("id{i:06}")).collect();
            columns.push(Series::new("_id", ids));
        }
        let classes: Vec<&str> = labels
            .iter()
            .map(|&pos| if pos { POSITIVE_LABEL } else { NEGATIVE_LABEL })
            .collect();
        columns.push(Series::new(TARGET_COLUMN, classes));

        for name in self.feature_names() {
            let values: Vec<Option<f64>> = labels
                .iter()
                .map(|&pos| {
                    if self.missing_rate > 0.0 && rng.gen_bool(self.missing_rate) {
                        return None;
                    }
                    let noise: f64 = rng.gen();
                    Some(if pos { noise + self.separation } else { noise })
                })
                .collect();
            columns.push(Series::new(&name, values));
        }

        for name in &self.empty_columns {
            columns.push(Series::new(name, vec![None::<f64>; self.rows]));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Sensor column name for an index: `aa_000`, `ab_000`, ...
#[must_use]
pub fn sensor_column_name(idx: usize) -> String {
    let first = char::from(b'a' + u8::try_from(idx / 26 % 26).unwrap_or(0));
    let second = char::from(b'a' + u8::try_from(idx % 26).unwrap_or(0));
    format!("{first}{second}_000")
}

/// Schema requiring every sensor column of `builder` and dropping `_id`.
#[must_use]
pub fn schema_for(builder: &SensorFrameBuilder) -> Schema {
    Schema {
        required_columns: builder.feature_names(),
        drop_columns: vec!["_id".to_string()],
        target_column: TARGET_COLUMN.to_string(),
    }
}

/// Settings with every path rooted under `root`.
#[must_use]
pub fn test_settings(root: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.paths.artifact_root = root.join("artifact");
    settings.paths.saved_models_root = root.join("saved_models");
    settings.paths.schema_file = root.join("schema.yaml");
    settings.store.uri = root.join("store").display().to_string();
    settings.prediction.inbox_dir = root.join("data").join("inbox");
    settings.prediction.outbox_dir = root.join("data").join("outbox");
    settings.prediction.archive_dir = root.join("data").join("archive");
    settings
}

/// Trains a model on synthetic data and deploys it as the next version
/// under `root`. Returns a labelled sample suitable for prediction and the
/// version written.
pub fn deploy_trained_model(root: &Path) -> Result<(DataFrame, ModelVersion)> {
    let builder = SensorFrameBuilder::new();
    let frame = builder.build()?;
    let features = builder.feature_names();

    let labels = label_column(&frame, TARGET_COLUMN)?;
    let transformer = FeatureTransformer::fit(&frame, &features)?;
    let encoder = TargetEncoder::fit(&labels)?;
    let x = transformer.transform(&frame)?;
    let y = Array1::from(encoder.transform(&labels)?);
    let mut model = LogisticRegression::default();
    model.fit(&x, &y)?;

    let counter = VersionCounter::new(root);
    let version = counter.read()?.map_or(ModelVersion::new(1), ModelVersion::next);
    let dir = root.join(version.to_string());
    save_object(&dir.join(MODEL_FILE_NAME), &model)?;
    save_object(&dir.join(TRANSFORMER_OBJECT_FILE_NAME), &transformer)?;
    save_object(&dir.join(TARGET_ENCODER_OBJECT_FILE_NAME), &encoder)?;
    counter.write(version)?;

    let sample_rows: Vec<usize> = (0..20).collect();
    Ok((take_rows(&frame, &sample_rows)?, version))
}
