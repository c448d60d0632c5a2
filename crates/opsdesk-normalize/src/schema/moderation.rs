use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::{NormalizeRow, NormalizeSnapshot};
use crate::pick::{
    ensure_number_map, field, field_any, pick_count, pick_string, rows, unwrap_envelope,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationItem {
    pub id: String,
    pub kind: String,
    pub status: String,
    pub reason: Option<String>,
    pub created_at: Option<String>,
    /// Classifier scores keyed by category.
    pub scores: BTreeMap<String, f64>,
}

impl NormalizeRow for ModerationItem {
    fn normalize_row(value: &Value) -> Option<Self> {
        let id = pick_string(field(value, "id"))?;
        Some(Self {
            id,
            kind: pick_string(field_any(value, &["kind", "type"])).unwrap_or_else(|| "unknown".into()),
            status: pick_string(field(value, "status"))
                .map(|s| s.to_ascii_lowercase())
                .unwrap_or_else(|| "pending".into()),
            reason: pick_string(field(value, "reason")),
            created_at: pick_string(field(value, "created_at")),
            scores: ensure_number_map(field(value, "scores")),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModerationQueue {
    pub pending: u64,
    pub items: Vec<ModerationItem>,
}

impl NormalizeSnapshot for ModerationQueue {
    fn normalize(value: &Value) -> Self {
        let items = ModerationItem::normalize_rows(rows(value, &["items", "queue"]));
        let value = unwrap_envelope(value);
        Self {
            pending: pick_count(field(value, "pending"))
                .unwrap_or_else(|| items.iter().filter(|i| i.status == "pending").count() as u64),
            items,
        }
    }
}

impl ModerationItem {
    pub fn top_score(&self) -> Option<(&str, f64)> {
        self.scores
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_for_missing_fields() {
        let queue = ModerationQueue::normalize(&json!({
            "items": [
                {"id": "r1", "type": "comment", "scores": {"spam": 0.9, "toxicity": "0.2", "bad": null}},
                {"id": null},
                {"id": 22, "status": "APPROVED", "scores": [1, 2]}
            ]
        }));
        assert_eq!(queue.items.len(), 2);
        assert_eq!(queue.pending, 1);
        let first = &queue.items[0];
        assert_eq!(first.kind, "comment");
        assert_eq!(first.status, "pending");
        assert_eq!(first.scores.len(), 2);
        assert_eq!(first.top_score(), Some(("spam", 0.9)));
        let second = &queue.items[1];
        assert_eq!(second.id, "22");
        assert_eq!(second.status, "approved");
        assert!(second.scores.is_empty());
    }
}
