use serde::Serialize;
use serde_json::Value;

use super::{NormalizeRow, NormalizeSnapshot};
use crate::pick::{
    ensure_count_map, field, field_any, pick_count, pick_string, sum_counts, unwrap_envelope,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventKindStat {
    pub kind: String,
    pub count: u64,
}

impl NormalizeRow for EventKindStat {
    fn normalize_row(value: &Value) -> Option<Self> {
        Some(Self {
            kind: pick_string(field_any(value, &["kind", "topic"]))?,
            count: pick_count(field(value, "count")).unwrap_or(0),
        })
    }
}

/// Event bus counters. `kinds` is sorted by count, busiest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventsSummary {
    pub start: Option<String>,
    pub total: u64,
    pub kinds: Vec<EventKindStat>,
}

impl NormalizeSnapshot for EventsSummary {
    fn normalize(value: &Value) -> Self {
        let value = unwrap_envelope(value);
        let raw_kinds = field(value, "kinds");
        let mut kinds = match raw_kinds {
            Some(Value::Object(_)) => ensure_count_map(raw_kinds)
                .into_iter()
                .map(|(kind, count)| EventKindStat { kind, count })
                .collect(),
            other => EventKindStat::normalize_rows(other),
        };
        kinds.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.kind.cmp(&b.kind)));
        Self {
            start: pick_string(field(value, "start")),
            total: pick_count(field(value, "total"))
                .unwrap_or_else(|| sum_counts(kinds.iter().map(|k| k.count))),
            kinds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_map_of_kinds() {
        let summary = EventsSummary::normalize(&json!({
            "start": "2024-01-01T00:00:00Z",
            "kinds": {"models.changed": 4, "actions.completed": "9", "bad": "x", "": 3}
        }));
        assert_eq!(summary.total, 13);
        assert_eq!(summary.kinds[0].kind, "actions.completed");
        assert_eq!(summary.kinds.len(), 2);
    }

    #[test]
    fn accepts_rows_of_kinds() {
        let summary = EventsSummary::normalize(&json!({
            "total": 100,
            "kinds": [{"kind": "a", "count": 1}, {"topic": "b", "count": 5}, {"count": 3}]
        }));
        assert_eq!(summary.total, 100);
        assert_eq!(
            summary.kinds,
            vec![
                EventKindStat { kind: "b".into(), count: 5 },
                EventKindStat { kind: "a".into(), count: 1 },
            ]
        );
    }
}
