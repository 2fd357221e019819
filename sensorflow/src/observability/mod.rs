//! Observability utilities.
//!
//! Logging goes through `tracing`. [`init_logging`] installs the subscriber
//! once per process; library code only emits.

mod logging;
mod tracing;
mod wide_events;

pub use self::logging::{env_filter, init_logging, LogFormat};
pub use self::tracing::{run_span, stage_span, SpanTimer};
pub use self::wide_events::{
    build_run_payload, build_stage_payload, emit_run_wide_events, RUN_WIDE_EVENT, STAGE_WIDE_EVENT,
};
