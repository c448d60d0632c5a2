use serde::Serialize;
use serde_json::Value;

use super::{NormalizeRow, NormalizeSnapshot};
use crate::pick::{field, pick_count, pick_number, pick_string, sum_counts, unwrap_envelope};

/// Latency/hit counters for one matched route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStat {
    pub path: String,
    pub hits: u64,
    pub errors: u64,
    pub ewma_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
}

impl RouteStat {
    fn from_parts(path: String, value: &Value) -> Self {
        Self {
            path,
            hits: pick_count(field(value, "hits")).unwrap_or(0),
            errors: pick_count(field(value, "errors")).unwrap_or(0),
            ewma_ms: pick_number(field(value, "ewma_ms")).unwrap_or(0.0),
            p95_ms: pick_number(field(value, "p95_ms")).unwrap_or(0.0),
            max_ms: pick_number(field(value, "max_ms")).unwrap_or(0.0),
        }
    }
}

impl NormalizeRow for RouteStat {
    fn normalize_row(value: &Value) -> Option<Self> {
        let path = pick_string(field(value, "path"))?;
        Some(Self::from_parts(path, value))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoutesSummary {
    pub routes: Vec<RouteStat>,
}

impl NormalizeSnapshot for RoutesSummary {
    fn normalize(value: &Value) -> Self {
        let value = unwrap_envelope(value);
        let routes = match field(value, "by_path") {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(path, stats)| {
                    let path = path.trim();
                    if path.is_empty() || !stats.is_object() {
                        return None;
                    }
                    Some(RouteStat::from_parts(path.to_string(), stats))
                })
                .collect(),
            _ => RouteStat::normalize_rows(field(value, "routes")),
        };
        Self { routes }
    }
}

impl RoutesSummary {
    /// Routes ordered by p95 latency, slowest first.
    pub fn slowest(&self, limit: usize) -> Vec<&RouteStat> {
        let mut sorted: Vec<&RouteStat> = self.routes.iter().collect();
        sorted.sort_by(|a, b| b.p95_ms.partial_cmp(&a.p95_ms).unwrap_or(std::cmp::Ordering::Equal));
        sorted.truncate(limit);
        sorted
    }

    pub fn total_hits(&self) -> u64 {
        sum_counts(self.routes.iter().map(|r| r.hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_by_path_map() {
        let summary = RoutesSummary::normalize(&json!({
            "by_path": {
                "/state/actions": {"hits": 7, "errors": 1, "ewma_ms": 30.0, "p95_ms": 90.0},
                "/state/economy/ledger": {"hits": 10, "errors": 0, "ewma_ms": "12.3", "p95_ms": 45.6},
                "/broken": 12
            }
        }));
        assert_eq!(summary.routes.len(), 2);
        assert_eq!(summary.total_hits(), 17);
        assert_eq!(summary.slowest(1)[0].path, "/state/actions");
    }

    #[test]
    fn reads_route_rows_after_round_trip() {
        let first = RoutesSummary::normalize(&json!({
            "by_path": {"/a": {"hits": 2, "max_ms": 9}}
        }));
        let again = RoutesSummary::normalize(&serde_json::to_value(&first).unwrap());
        assert_eq!(first, again);
    }
}
