//! Run identity for tracking pipeline executions.

use crate::utils::{run_dir_stamp, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one pipeline execution.
///
/// The timestamp names the run directory; the UUID correlates log lines and
/// artifact envelopes across processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// Unique id of the run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: Timestamp,
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl RunIdentity {
    /// Creates a new identity stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        Self::at(crate::utils::now_utc())
    }

    /// Creates an identity for a given start time.
    #[must_use]
    pub fn at(started_at: Timestamp) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
        }
    }

    /// Returns the run directory name, e.g. `10_19_2026_14_03_59`.
    #[must_use]
    pub fn dir_name(&self) -> String {
        run_dir_stamp(&self.started_at)
    }

    /// Returns the run id as a string.
    #[must_use]
    pub fn id_str(&self) -> String {
        self.run_id.to_string()
    }
}
