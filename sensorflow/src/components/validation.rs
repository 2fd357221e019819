//! Data validation: schema gates, missing-value pruning and drift report.
//!
//! Gates run in a fixed order: schema drop columns, high-missing columns,
//! required columns, column count. The first failing gate aborts the run,
//! but the report gathered so far is always written.

use crate::config::{DataValidationConfig, Schema};
use crate::core::{DataIngestionArtifact, DataValidationArtifact};
use crate::data::{
    column_names, drop_columns, has_column, missing_columns, missing_percentage, numeric_values, read_csv, write_csv,
    DataFrame,
};
use crate::errors::{IoResultExt, Result, SchemaViolation};
use crate::ml::ks_2samp;
use crate::stages::Stage;
use crate::utils::fs::ensure_parent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use tracing::{info, instrument, warn};

/// Report key for columns dropped from the train frame.
pub const TRAIN_MISSING_VALUES_KEY: &str = "train_missing_values_columns";
/// Report key for columns dropped from the test frame.
pub const TEST_MISSING_VALUES_KEY: &str = "test_missing_values_columns";
/// Report key for required columns absent from the train frame.
pub const TRAIN_REQUIRED_KEY: &str = "train_required_column";
/// Report key for required columns absent from the test frame.
pub const TEST_REQUIRED_KEY: &str = "test_required_column";
/// Report key for per-column drift results.
pub const DRIFT_KEY: &str = "train_test_drift";
/// Report key for columns the drift test could not handle.
pub const DRIFT_SKIPPED_KEY: &str = "train_test_drift_skipped";

/// Drift result of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftRecord {
    /// Two-sample KS p-value.
    pub p_value: f64,
    /// True when the p-value is above the cut-off.
    pub same_distribution: bool,
}

/// One entry of the validation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportEntry {
    /// A list of column names.
    Columns(Vec<String>),
    /// Drift results by column.
    Drift(BTreeMap<String, DriftRecord>),
}

/// Validation report, keyed by finding.
pub type ValidationReport = BTreeMap<String, ReportEntry>;

/// Result of [`validate`].
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// Cleaned train frame.
    pub train: DataFrame,
    /// Cleaned test frame.
    pub test: DataFrame,
    /// Findings gathered up to the first failing gate.
    pub report: ValidationReport,
    /// The failing gate, if any.
    pub violation: Option<SchemaViolation>,
}

impl ValidationOutcome {
    /// True when every gate passed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.violation.is_none()
    }
}

/// Drops columns whose missing percentage is strictly above `threshold`.
/// Returns the dropped names in frame order.
pub fn drop_missing_values_columns(frame: &mut DataFrame, threshold: f64) -> Vec<String> {
    let too_sparse: Vec<String> = column_names(frame)
        .into_iter()
        .filter(|name| missing_percentage(frame, name).is_some_and(|pct| pct > threshold))
        .collect();
    let (kept, dropped) = drop_columns(frame, &too_sparse);
    *frame = kept;
    dropped
}

/// Returns the required columns absent from `frame`.
#[must_use]
pub fn missing_required_columns(frame: &DataFrame, required: &[String]) -> Vec<String> {
    missing_columns(frame, required)
}

/// Runs the two-sample KS test on every column shared by both frames.
///
/// Columns without numeric values on either side are returned separately.
#[must_use]
pub fn detect_drift(
    base: &DataFrame,
    current: &DataFrame,
    p_value_cutoff: f64,
) -> (BTreeMap<String, DriftRecord>, Vec<String>) {
    let mut drift = BTreeMap::new();
    let mut skipped = Vec::new();
    for name in column_names(base).into_iter().filter(|name| has_column(current, name)) {
        match ks_2samp(&numeric_values(base, &name), &numeric_values(current, &name)) {
            Some(result) => {
                drift.insert(
                    name,
                    DriftRecord {
                        p_value: result.p_value,
                        same_distribution: result.p_value > p_value_cutoff,
                    },
                );
            }
            None => skipped.push(name),
        }
    }
    (drift, skipped)
}

/// Validates a train/test pair against the schema.
#[must_use]
pub fn validate(
    train: DataFrame,
    test: DataFrame,
    schema: &Schema,
    missing_threshold: f64,
    drift_p_value: f64,
) -> ValidationOutcome {
    let mut report = ValidationReport::new();

    let (mut train, _) = drop_columns(&train, &schema.drop_columns);
    let (mut test, _) = drop_columns(&test, &schema.drop_columns);

    let train_dropped = drop_missing_values_columns(&mut train, missing_threshold);
    let test_dropped = drop_missing_values_columns(&mut test, missing_threshold);
    report.insert(TRAIN_MISSING_VALUES_KEY.to_string(), ReportEntry::Columns(train_dropped));
    report.insert(TEST_MISSING_VALUES_KEY.to_string(), ReportEntry::Columns(test_dropped));

    let fail = |train: DataFrame, test: DataFrame, report: ValidationReport, violation: SchemaViolation| {
        ValidationOutcome {
            train,
            test,
            report,
            violation: Some(violation),
        }
    };

    let emptied = if train.width() == 0 {
        Some("train")
    } else if test.width() == 0 {
        Some("test")
    } else {
        None
    };
    if let Some(label) = emptied {
        let violation = SchemaViolation::NoColumnsLeft {
            frame: label.to_string(),
        };
        return fail(train, test, report, violation);
    }

    let train_missing = missing_required_columns(&train, &schema.required_columns);
    let test_missing = missing_required_columns(&test, &schema.required_columns);
    if !train_missing.is_empty() {
        report.insert(TRAIN_REQUIRED_KEY.to_string(), ReportEntry::Columns(train_missing.clone()));
    }
    if !test_missing.is_empty() {
        report.insert(TEST_REQUIRED_KEY.to_string(), ReportEntry::Columns(test_missing.clone()));
    }
    if !train_missing.is_empty() {
        let violation = SchemaViolation::MissingRequiredColumns {
            frame: "train".to_string(),
            missing: train_missing,
        };
        return fail(train, test, report, violation);
    }
    if !test_missing.is_empty() {
        let violation = SchemaViolation::MissingRequiredColumns {
            frame: "test".to_string(),
            missing: test_missing,
        };
        return fail(train, test, report, violation);
    }

    if train.width() != test.width() {
        let violation = SchemaViolation::ColumnCountMismatch {
            train: train.width(),
            test: test.width(),
        };
        return fail(train, test, report, violation);
    }

    let (drift, skipped) = detect_drift(&train, &test, drift_p_value);
    report.insert(DRIFT_KEY.to_string(), ReportEntry::Drift(drift));
    report.insert(DRIFT_SKIPPED_KEY.to_string(), ReportEntry::Columns(skipped));

    ValidationOutcome {
        train,
        test,
        report,
        violation: None,
    }
}

/// Validates the ingested split and writes the cleaned frames and report.
#[derive(Debug)]
pub struct DataValidation {
    config: DataValidationConfig,
    schema: Schema,
}

impl DataValidation {
    /// Creates the stage.
    #[must_use]
    pub const fn new(config: DataValidationConfig, schema: Schema) -> Self {
        Self { config, schema }
    }

    /// Runs validation.
    #[instrument(skip_all)]
    pub fn initiate(&self, ingestion: &DataIngestionArtifact) -> Result<DataValidationArtifact> {
        let train = read_csv(&ingestion.train_file_path)?;
        let test = read_csv(&ingestion.test_file_path)?;

        let outcome = validate(
            train,
            test,
            &self.schema,
            self.config.missing_threshold,
            self.config.drift_p_value,
        );
        self.write_report(&outcome.report)?;

        let ValidationOutcome {
            mut train,
            mut test,
            report,
            violation,
        } = outcome;
        if let Some(violation) = violation {
            warn!(error = %violation, "data validation failed");
            write_csv(&mut train, &self.config.invalid_train_file_path)?;
            write_csv(&mut test, &self.config.invalid_test_file_path)?;
            return Err(violation.into());
        }

        write_csv(&mut train, &self.config.valid_train_file_path)?;
        write_csv(&mut test, &self.config.valid_test_file_path)?;

        if let Some(ReportEntry::Drift(drift)) = report.get(DRIFT_KEY) {
            let drifted = drift.values().filter(|d| !d.same_distribution).count();
            info!(columns = drift.len(), drifted, "drift report complete");
        }

        Ok(DataValidationArtifact {
            report_file_path: self.config.report_file_path.clone(),
            train_file_path: self.config.valid_train_file_path.clone(),
            test_file_path: self.config.valid_test_file_path.clone(),
            status: true,
        })
    }

    fn write_report(&self, report: &ValidationReport) -> Result<()> {
        let path = &self.config.report_file_path;
        ensure_parent(path)?;
        let yaml = serde_yaml::to_string(report)?;
        fs::write(path, yaml).at_path(path)
    }
}

#[async_trait]
impl Stage for DataValidation {
    type Input = DataIngestionArtifact;
    type Output = DataValidationArtifact;

    async fn execute(&self, input: DataIngestionArtifact) -> Result<DataValidationArtifact> {
        self.initiate(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{read_csv_bytes, take_rows};
    use crate::errors::ErrorKind;
    use crate::testing::{schema_for, SensorFrameBuilder};
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tempfile::TempDir;

    fn frame(csv: &str) -> DataFrame {
        read_csv_bytes(csv).unwrap()
    }

    fn schema(required: &[&str], drop: &[&str]) -> Schema {
        Schema {
            required_columns: required.iter().map(|s| (*s).to_string()).collect(),
            drop_columns: drop.iter().map(|s| (*s).to_string()).collect(),
            target_column: "class".to_string(),
        }
    }

    fn config(root: &Path) -> DataValidationConfig {
        let dir = root.join("data_validation");
        DataValidationConfig {
            report_file_path: dir.join("report").join("report.yaml"),
            valid_train_file_path: dir.join("valid").join("train.csv"),
            valid_test_file_path: dir.join("valid").join("test.csv"),
            invalid_train_file_path: dir.join("invalid").join("train.csv"),
            invalid_test_file_path: dir.join("invalid").join("test.csv"),
            missing_threshold: 70.0,
            drift_p_value: 0.05,
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        // ab_000 is exactly 75% missing, ac_000 exactly 50%
        let mut f = frame("aa_000,ab_000,ac_000\n1,na,na\n2,na,na\n3,na,1\n4,1,1\n");
        assert_eq!(drop_missing_values_columns(&mut f, 75.0), Vec::<String>::new());
        assert_eq!(drop_missing_values_columns(&mut f, 70.0), vec!["ab_000".to_string()]);
        assert_eq!(column_names(&f), vec!["aa_000", "ac_000"]);
    }

    #[test]
    fn test_validation_passes_and_reports_drift() {
        let builder = SensorFrameBuilder::new().rows(100).features(3).with_id().empty_column("zz_000");
        let data = builder.build().unwrap();
        let train = take_rows(&data, &(0..80).collect::<Vec<_>>()).unwrap();
        let test = take_rows(&data, &(80..100).collect::<Vec<_>>()).unwrap();

        let outcome = validate(train, test, &schema_for(&builder), 70.0, 0.05);

        assert!(outcome.passed());
        assert!(!has_column(&outcome.train, "_id"));
        assert!(!has_column(&outcome.train, "zz_000"));
        assert_eq!(
            outcome.report[TRAIN_MISSING_VALUES_KEY],
            ReportEntry::Columns(vec!["zz_000".to_string()])
        );
        let ReportEntry::Drift(drift) = &outcome.report[DRIFT_KEY] else {
            panic!("drift entry missing");
        };
        assert_eq!(drift.len(), 3);
        assert_eq!(
            outcome.report[DRIFT_SKIPPED_KEY],
            ReportEntry::Columns(vec!["class".to_string()])
        );
    }

    #[test]
    fn test_identical_frames_have_same_distribution() {
        let f = frame("class,aa_000\nneg,1\nneg,2\npos,3\nneg,4\n");
        let (drift, _) = detect_drift(&f, &f, 0.05);
        assert!(drift["aa_000"].same_distribution);
        assert!((drift["aa_000"].p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_independent_draws_keep_distribution() {
        let base = SensorFrameBuilder::new().rows(400).features(3).seed(11).build().unwrap();
        let current = SensorFrameBuilder::new().rows(400).features(3).seed(12).build().unwrap();

        let (drift, skipped) = detect_drift(&base, &current, 0.001);

        assert_eq!(skipped, vec!["class".to_string()]);
        assert_eq!(drift.len(), 3);
        for (name, record) in &drift {
            assert!(record.same_distribution, "{name} p={}", record.p_value);
            assert!(record.p_value <= 1.0);
        }
    }

    #[test]
    fn test_shifted_readings_are_flagged() {
        let base = SensorFrameBuilder::new().rows(400).features(2).positive_rate(0.1).build().unwrap();
        let current = SensorFrameBuilder::new()
            .rows(400)
            .features(2)
            .positive_rate(0.9)
            .seed(12)
            .build()
            .unwrap();

        let (drift, _) = detect_drift(&base, &current, 0.05);

        assert_eq!(drift.len(), 2);
        for record in drift.values() {
            assert!(!record.same_distribution);
            assert!(record.p_value < 1e-6);
        }
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let train = frame("class,aa_000,ab_000\nneg,1,2\n");
        let test = frame("class,aa_000\nneg,1\n");

        let outcome = validate(train, test, &schema(&["aa_000", "ab_000"], &[]), 70.0, 0.05);

        assert_eq!(
            outcome.violation,
            Some(SchemaViolation::MissingRequiredColumns {
                frame: "test".to_string(),
                missing: vec!["ab_000".to_string()],
            })
        );
        assert_eq!(
            outcome.report[TEST_REQUIRED_KEY],
            ReportEntry::Columns(vec!["ab_000".to_string()])
        );
        assert!(!outcome.report.contains_key(TRAIN_REQUIRED_KEY));
    }

    #[test]
    fn test_column_count_mismatch_is_fatal() {
        let train = frame("class,aa_000,ab_000\nneg,1,2\n");
        let test = frame("class,aa_000\nneg,1\n");

        let outcome = validate(train, test, &schema(&["aa_000"], &[]), 70.0, 0.05);

        assert_eq!(
            outcome.violation,
            Some(SchemaViolation::ColumnCountMismatch { train: 3, test: 2 })
        );
        assert!(!outcome.report.contains_key(DRIFT_KEY));
    }

    #[test]
    fn test_no_columns_left_is_fatal() {
        let train = frame("aa_000,ab_000\nna,na\nna,na\n");
        let test = frame("aa_000,ab_000\n1,2\n3,4\n");

        let outcome = validate(train, test, &schema(&[], &[]), 70.0, 0.05);

        assert_eq!(
            outcome.violation,
            Some(SchemaViolation::NoColumnsLeft {
                frame: "train".to_string()
            })
        );
    }

    #[test]
    fn test_absent_drop_columns_are_ignored() {
        let train = frame("class,aa_000\nneg,1\npos,2\n");
        let test = frame("class,aa_000\nneg,1\npos,2\n");

        let outcome = validate(train, test, &schema(&["aa_000"], &["_id", "not_there"]), 70.0, 0.05);
        assert!(outcome.passed());
    }

    #[tokio::test]
    async fn test_stage_writes_report_even_on_failure() {
        let tmp = TempDir::new().unwrap();
        let ingestion = DataIngestionArtifact {
            train_file_path: tmp.path().join("train.csv"),
            test_file_path: tmp.path().join("test.csv"),
        };
        fs::write(&ingestion.train_file_path, "class,aa_000,ab_000\nneg,1,2\n").unwrap();
        fs::write(&ingestion.test_file_path, "class,aa_000\nneg,1\n").unwrap();
        let cfg = config(tmp.path());

        let err = DataValidation::new(cfg.clone(), schema(&["ab_000"], &[]))
            .execute(ingestion)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Schema);
        let report: ValidationReport =
            serde_yaml::from_str(&fs::read_to_string(&cfg.report_file_path).unwrap()).unwrap();
        assert_eq!(
            report[TEST_REQUIRED_KEY],
            ReportEntry::Columns(vec!["ab_000".to_string()])
        );
        assert!(cfg.invalid_test_file_path.is_file());
        assert!(!cfg.valid_test_file_path.exists());
    }

    #[tokio::test]
    async fn test_stage_writes_valid_frames() {
        let tmp = TempDir::new().unwrap();
        let builder = SensorFrameBuilder::new().rows(60).features(2);
        let data = builder.build().unwrap();
        let ingestion = DataIngestionArtifact {
            train_file_path: tmp.path().join("train.csv"),
            test_file_path: tmp.path().join("test.csv"),
        };
        let mut train = take_rows(&data, &(0..45).collect::<Vec<_>>()).unwrap();
        let mut test = take_rows(&data, &(45..60).collect::<Vec<_>>()).unwrap();
        write_csv(&mut train, &ingestion.train_file_path).unwrap();
        write_csv(&mut test, &ingestion.test_file_path).unwrap();

        let artifact = DataValidation::new(config(tmp.path()), schema_for(&builder))
            .execute(ingestion)
            .await
            .unwrap();

        assert!(artifact.status);
        assert!(artifact.train_file_path.is_file());
        assert!(artifact.report_file_path.is_file());
    }
}
