//! Stage trait.
//!
//! Stages are the units of work of the training pipeline. Each one consumes
//! the artifacts of the stages it depends on and produces exactly one
//! artifact of its own.

mod result;

pub use result::StageRecord;

use crate::core::{Artifact, StageName};
use crate::errors::Result;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Inbound artifacts.
    type Input: Send + 'static;

    /// Produced artifact.
    type Output: Artifact;

    /// Returns the name of the stage.
    fn name(&self) -> StageName {
        <Self::Output as Artifact>::STAGE
    }

    /// Executes the stage.
    ///
    /// # Errors
    ///
    /// Any error aborts the run. The orchestrator attaches the stage name.
    async fn execute(&self, input: Self::Input) -> Result<Self::Output>;
}
