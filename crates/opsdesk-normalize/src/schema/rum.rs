use serde::Serialize;
use serde_json::Value;

use super::{NormalizeRow, NormalizeSnapshot};
use crate::pick::{field, field_any, pick_count, pick_number, pick_ratio, pick_string, rows, unwrap_envelope};

/// One web-vital aggregate (LCP, INP, CLS, TTFB, ...), optionally per page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RumVitalStat {
    pub metric: String,
    pub page: Option<String>,
    pub p75: f64,
    pub samples: u64,
    pub good_ratio: f64,
}

impl NormalizeRow for RumVitalStat {
    fn normalize_row(value: &Value) -> Option<Self> {
        let metric = pick_string(field_any(value, &["metric", "name"]))?.to_ascii_uppercase();
        Some(Self {
            metric,
            page: pick_string(field_any(value, &["page", "route"])),
            p75: pick_number(field(value, "p75")).unwrap_or(0.0),
            samples: pick_count(field_any(value, &["samples", "count"])).unwrap_or(0),
            good_ratio: pick_ratio(field(value, "good_ratio")).unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RumSummary {
    pub sessions: u64,
    pub vitals: Vec<RumVitalStat>,
}

impl NormalizeSnapshot for RumSummary {
    fn normalize(value: &Value) -> Self {
        let value = unwrap_envelope(value);
        Self {
            sessions: pick_count(field(value, "sessions")).unwrap_or(0),
            vitals: RumVitalStat::normalize_rows(rows(value, &["vitals", "metrics"])),
        }
    }
}

impl RumSummary {
    pub fn vital(&self, metric: &str) -> impl Iterator<Item = &RumVitalStat> {
        let metric = metric.to_ascii_uppercase();
        self.vitals.iter().filter(move |v| v.metric == metric)
    }
}
