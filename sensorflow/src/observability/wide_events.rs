//! Wide events: one comprehensive payload per stage and per run.

use crate::core::{StageEvent, StageStatus};
use crate::events::EventSink;
use crate::stages::StageRecord;
use std::collections::BTreeMap;

/// Event type of per-stage wide events.
pub const STAGE_WIDE_EVENT: &str = "stage.wide";
/// Event type of per-run wide events.
pub const RUN_WIDE_EVENT: &str = "run.wide";

/// Builds a stage payload.
#[must_use]
pub fn build_stage_payload(run_id: &str, record: &StageRecord) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "run_id": run_id,
        "stage": record.name.as_str(),
        "status": record.status.to_string(),
        "started_at": record.started_at.to_rfc3339(),
        "ended_at": record.ended_at.to_rfc3339(),
        "duration_ms": record.duration_ms(),
    });
    if let Some(detail) = &record.detail {
        payload["detail"] = serde_json::json!(detail);
    }
    payload
}

/// Builds a run payload.
#[must_use]
pub fn build_run_payload(
    run_id: &str,
    records: &[StageRecord],
    model_accepted: Option<bool>,
    pushed_version: Option<u64>,
) -> serde_json::Value {
    let status = if records.iter().any(|r| r.status == StageStatus::Failed) {
        "failed"
    } else {
        "completed"
    };

    let mut stage_counts: BTreeMap<String, u32> = BTreeMap::new();
    for record in records {
        *stage_counts.entry(record.status.to_string()).or_insert(0) += 1;
    }
    let stage_details: Vec<serde_json::Value> =
        records.iter().map(|r| build_stage_payload(run_id, r)).collect();

    serde_json::json!({
        "run_id": run_id,
        "status": status,
        "model_accepted": model_accepted,
        "pushed_version": pushed_version,
        "stage_counts": stage_counts,
        "stage_details": stage_details,
    })
}

/// Emits a run's wide events: one per stage record, then one for the run.
pub fn emit_run_wide_events(
    sink: &dyn EventSink,
    run_id: &str,
    records: &[StageRecord],
    model_accepted: Option<bool>,
    pushed_version: Option<u64>,
) {
    for record in records {
        sink.try_emit(&wide_event(STAGE_WIDE_EVENT, build_stage_payload(run_id, record)));
    }
    let payload = build_run_payload(run_id, records, model_accepted, pushed_version);
    sink.try_emit(&wide_event(RUN_WIDE_EVENT, payload));
}

fn wide_event(event_type: &str, payload: serde_json::Value) -> StageEvent {
    let mut event = StageEvent::new(event_type);
    if let serde_json::Value::Object(map) = payload {
        for (key, value) in map {
            event = event.add_data(key, value);
        }
    }
    event
}
