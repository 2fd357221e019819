//! Span helpers for pipeline stages.

use crate::core::StageName;
use std::time::Instant;
use tracing::{info_span, Span};

/// Opens the span every stage of a run executes under.
#[must_use]
pub fn stage_span(run_id: &str, stage: StageName) -> Span {
    info_span!("stage", run_id = %run_id, stage = %stage)
}

/// Opens the span a whole run executes under.
#[must_use]
pub fn run_span(run_id: &str) -> Span {
    info_span!("training_run", run_id = %run_id)
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}
