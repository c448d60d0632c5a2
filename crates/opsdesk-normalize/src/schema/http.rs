use serde::Serialize;
use serde_json::Value;

use super::{NormalizeRow, NormalizeSnapshot};
use crate::pick::{
    field, field_any, pick_count, pick_number, pick_ratio, pick_string, rows, sum_counts,
    unwrap_envelope,
};

/// Per-route HTTP statistics. `method` and `path` identify the row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpPathStat {
    pub method: String,
    pub path: String,
    pub avg_duration_ms: f64,
    pub requests_total: u64,
    pub error5xx_ratio: f64,
}

impl NormalizeRow for HttpPathStat {
    fn normalize_row(value: &Value) -> Option<Self> {
        let method = pick_string(field(value, "method"))?.to_ascii_uppercase();
        let path = pick_string(field(value, "path"))?;
        let requests_total = pick_count(field(value, "requests_total")).unwrap_or(0);
        let error5xx_ratio = pick_ratio(field(value, "error5xx_ratio"))
            .or_else(|| {
                let errors = pick_count(field(value, "error5xx_total"))?;
                (requests_total > 0).then(|| (errors as f64 / requests_total as f64).min(1.0))
            })
            .unwrap_or(0.0);
        Some(Self {
            method,
            path,
            avg_duration_ms: pick_number(field(value, "avg_duration_ms"))
                .filter(|ms| *ms >= 0.0)
                .unwrap_or(0.0),
            requests_total,
            error5xx_ratio,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HttpSummary {
    pub window: Option<String>,
    pub requests_total: u64,
    pub error4xx_total: u64,
    pub error5xx_total: u64,
    pub avg_duration_ms: f64,
    pub p95_duration_ms: Option<f64>,
    pub paths: Vec<HttpPathStat>,
}

impl NormalizeSnapshot for HttpSummary {
    fn normalize(value: &Value) -> Self {
        let value = unwrap_envelope(value);
        let paths = HttpPathStat::normalize_rows(rows(value, &["paths", "by_path", "routes"]));
        // Totals may be nested or flattened next to the rows.
        let totals = match field(value, "totals") {
            Some(t) if t.is_object() => t,
            _ => value,
        };
        let requests_total = pick_count(field(totals, "requests_total"))
            .unwrap_or_else(|| sum_counts(paths.iter().map(|p| p.requests_total)));
        let avg_duration_ms = pick_number(field(totals, "avg_duration_ms"))
            .unwrap_or_else(|| weighted_avg(&paths));
        Self {
            window: pick_string(field(value, "window")),
            requests_total,
            error4xx_total: pick_count(field_any(totals, &["error4xx_total", "errors_4xx"]))
                .unwrap_or(0),
            error5xx_total: pick_count(field_any(totals, &["error5xx_total", "errors_5xx"]))
                .unwrap_or(0),
            avg_duration_ms,
            p95_duration_ms: pick_number(field(totals, "p95_duration_ms")),
            paths,
        }
    }
}

impl HttpSummary {
    pub fn error5xx_ratio(&self) -> f64 {
        if self.requests_total == 0 {
            0.0
        } else {
            self.error5xx_total as f64 / self.requests_total as f64
        }
    }
}

fn weighted_avg(paths: &[HttpPathStat]) -> f64 {
    let total = sum_counts(paths.iter().map(|p| p.requests_total));
    if total == 0 {
        return 0.0;
    }
    paths
        .iter()
        .map(|p| p.avg_duration_ms * p.requests_total as f64)
        .sum::<f64>()
        / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_stat_fills_defaults() {
        let row = HttpPathStat::normalize_row(&json!({
            "method": "GET",
            "path": "/v1/users",
            "avg_duration_ms": "12.5"
        }))
        .expect("row kept");
        assert_eq!(
            row,
            HttpPathStat {
                method: "GET".into(),
                path: "/v1/users".into(),
                avg_duration_ms: 12.5,
                requests_total: 0,
                error5xx_ratio: 0.0,
            }
        );
    }

    #[test]
    fn path_stat_requires_method_and_path() {
        assert!(HttpPathStat::normalize_row(&json!({"method": null, "path": "/x"})).is_none());
        assert!(HttpPathStat::normalize_row(&json!({"method": "GET", "path": "  "})).is_none());
        assert!(HttpPathStat::normalize_row(&json!(["GET", "/x"])).is_none());
    }

    #[test]
    fn ratio_derived_from_error_count() {
        let row = HttpPathStat::normalize_row(&json!({
            "method": "post",
            "path": "/v1/jobs",
            "requests_total": 200,
            "error5xx_total": 10
        }))
        .unwrap();
        assert_eq!(row.method, "POST");
        assert!((row.error5xx_ratio - 0.05).abs() < 1e-9);
    }

    #[test]
    fn summary_derives_totals_from_rows() {
        let summary = HttpSummary::normalize(&json!({
            "window": "1h",
            "paths": [
                {"method": "GET", "path": "/a", "requests_total": 3, "avg_duration_ms": 10},
                {"method": null, "path": "/dropped", "requests_total": 1000},
                {"method": "GET", "path": "/b", "requests_total": 1, "avg_duration_ms": 30}
            ]
        }));
        assert_eq!(summary.paths.len(), 2);
        assert_eq!(summary.requests_total, 4);
        assert!((summary.avg_duration_ms - 15.0).abs() < 1e-9);
        assert_eq!(summary.window.as_deref(), Some("1h"));
    }

    #[test]
    fn summary_reads_nested_totals() {
        let summary = HttpSummary::normalize(&json!({
            "data": {
                "totals": {"requests_total": "50", "error5xx_total": 5, "p95_duration_ms": 80},
                "paths": []
            }
        }));
        assert_eq!(summary.requests_total, 50);
        assert_eq!(summary.error5xx_total, 5);
        assert_eq!(summary.p95_duration_ms, Some(80.0));
        assert!((summary.error5xx_ratio() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn derived_totals_saturate_and_ignore_negative_latency() {
        let summary = HttpSummary::normalize(&json!({
            "paths": [
                {"method": "GET", "path": "/a", "requests_total": u64::MAX, "avg_duration_ms": 4},
                {"method": "GET", "path": "/b", "requests_total": 9, "avg_duration_ms": -1e308}
            ]
        }));
        assert_eq!(summary.requests_total, u64::MAX);
        assert_eq!(summary.paths[1].avg_duration_ms, 0.0);
        assert!(summary.avg_duration_ms.is_finite());
    }
}
