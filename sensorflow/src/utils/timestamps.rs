//! Timestamp helpers for run directories, output files and events.

use chrono::{DateTime, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Format of run directory names, e.g. `10_19_2026_14_03_59`.
pub const RUN_DIR_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

/// Format of batch-prediction file suffixes, e.g. `10192026__140359`.
pub const FILE_STAMP_FORMAT: &str = "%m%d%Y__%H%M%S";

/// Returns the current UTC time as an ISO 8601 formatted string.
///
/// # Examples
///
/// ```
/// use sensorflow::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Formats a run directory name.
#[must_use]
pub fn run_dir_stamp(ts: &Timestamp) -> String {
    ts.format(RUN_DIR_FORMAT).to_string()
}

/// Formats a prediction file suffix.
#[must_use]
pub fn file_stamp(ts: &Timestamp) -> String {
    ts.format(FILE_STAMP_FORMAT).to_string()
}
