//! Per-resource record shapes for the admin API.
//!
//! Rows have identifying fields and are dropped when those cannot be
//! extracted. Snapshots never fail; garbage collapses to `Default`.

use serde_json::Value;

mod billing;
mod events;
mod http;
mod llm;
mod models;
mod moderation;
mod routes;
mod rum;
mod workers;

pub use billing::{BillingOverview, Invoice};
pub use events::{EventKindStat, EventsSummary};
pub use http::{HttpPathStat, HttpSummary};
pub use llm::{LlmCallMetric, LlmSummary};
pub use models::{AiModel, ModelCatalog};
pub use moderation::{ModerationItem, ModerationQueue};
pub use routes::{RouteStat, RoutesSummary};
pub use rum::{RumSummary, RumVitalStat};
pub use workers::{WorkerState, WorkerStatus, WorkersSummary};

/// A record with identifying fields.
pub trait NormalizeRow: Sized {
    fn normalize_row(value: &Value) -> Option<Self>;

    fn normalize_rows(value: Option<&Value>) -> Vec<Self> {
        crate::pick::ensure_array(value, Self::normalize_row)
    }
}

/// A whole payload; total.
pub trait NormalizeSnapshot: Sized + Default {
    fn normalize(value: &Value) -> Self;
}
