use serde::Serialize;
use serde_json::Value;

use super::{NormalizeRow, NormalizeSnapshot};
use crate::pick::{field, field_any, pick_boolean, pick_count, pick_string, rows, unwrap_envelope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Busy,
    Idle,
    Offline,
    #[default]
    Unknown,
}

impl WorkerState {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("busy" | "running" | "working") => WorkerState::Busy,
            Some("idle" | "ready") => WorkerState::Idle,
            Some("offline" | "down" | "stopped") => WorkerState::Offline,
            _ => WorkerState::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerStatus {
    pub id: String,
    pub name: Option<String>,
    pub state: WorkerState,
    pub healthy: bool,
    pub jobs_processed: u64,
    pub last_heartbeat: Option<String>,
}

impl NormalizeRow for WorkerStatus {
    fn normalize_row(value: &Value) -> Option<Self> {
        let id = pick_string(field_any(value, &["id", "worker_id"]))?;
        let state = WorkerState::parse(pick_string(field_any(value, &["state", "status"])).as_deref());
        Some(Self {
            id,
            name: pick_string(field(value, "name")),
            state,
            healthy: pick_boolean(field(value, "healthy")).unwrap_or(state != WorkerState::Offline),
            jobs_processed: pick_count(field(value, "jobs_processed")).unwrap_or(0),
            last_heartbeat: pick_string(field(value, "last_heartbeat")),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkersSummary {
    pub total: u64,
    pub busy: u64,
    pub idle: u64,
    pub queue_depth: u64,
    pub workers: Vec<WorkerStatus>,
}

impl NormalizeSnapshot for WorkersSummary {
    fn normalize(value: &Value) -> Self {
        let value = unwrap_envelope(value);
        let workers = WorkerStatus::normalize_rows(rows(value, &["workers", "items"]));
        let count = |state: WorkerState| workers.iter().filter(|w| w.state == state).count() as u64;
        Self {
            total: pick_count(field(value, "total")).unwrap_or(workers.len() as u64),
            busy: pick_count(field(value, "busy")).unwrap_or_else(|| count(WorkerState::Busy)),
            idle: pick_count(field(value, "idle")).unwrap_or_else(|| count(WorkerState::Idle)),
            queue_depth: pick_count(field_any(value, &["queue_depth", "queued"])).unwrap_or(0),
            workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_derived_from_rows() {
        let summary = WorkersSummary::normalize(&json!({
            "workers": [
                {"id": "w1", "state": "BUSY", "jobs_processed": 12},
                {"id": "w2", "status": "idle", "healthy": "false"},
                {"name": "ghost", "state": "busy"},
                {"worker_id": 7, "state": "down"}
            ],
            "queue_depth": "3"
        }));
        assert_eq!(summary.total, 3);
        assert_eq!(summary.busy, 1);
        assert_eq!(summary.idle, 1);
        assert_eq!(summary.queue_depth, 3);
        assert_eq!(summary.workers[2].id, "7");
        assert!(!summary.workers[2].healthy);
        assert!(!summary.workers[1].healthy);
        assert!(summary.workers[0].healthy);
    }

    #[test]
    fn garbage_yields_empty_summary() {
        assert_eq!(WorkersSummary::normalize(&json!("nope")), WorkersSummary::default());
        assert_eq!(WorkersSummary::normalize(&json!({"workers": {"id": "w1"}})).total, 0);
    }
}
