use opsdesk_normalize::{HttpPathStat, HttpSummary, NormalizeRow, NormalizeSnapshot};
use serde_json::json;

#[test]
fn numeric_strings_are_coerced_and_defaults_filled() {
    let rows = HttpPathStat::normalize_rows(Some(&json!([
        {"method": "GET", "path": "/v1/users", "avg_duration_ms": "12.5"}
    ])));
    assert_eq!(
        rows,
        vec![HttpPathStat {
            method: "GET".to_string(),
            path: "/v1/users".to_string(),
            avg_duration_ms: 12.5,
            requests_total: 0,
            error5xx_ratio: 0.0,
        }]
    );
}

#[test]
fn row_without_method_is_dropped() {
    let rows = HttpPathStat::normalize_rows(Some(&json!([
        {"method": null, "path": "/x"},
        {"method": "DELETE", "path": "/y"}
    ])));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].path, "/y");
}

#[test]
fn normalizing_twice_is_stable() {
    let raw = json!({
        "window": " 15m ",
        "totals": {"requests_total": 10, "error5xx_total": 1, "avg_duration_ms": 20.5},
        "paths": [
            {"method": "get", "path": "/a", "requests_total": "8", "avg_duration_ms": 20, "error5xx_total": 1},
            {"method": "POST", "path": "/b", "requests_total": 2, "avg_duration_ms": 22.5}
        ]
    });
    let once = HttpSummary::normalize(&raw);
    let twice = HttpSummary::normalize(&serde_json::to_value(&once).unwrap());
    assert_eq!(once, twice);
    assert_eq!(once.window.as_deref(), Some("15m"));
    assert!((once.paths[0].error5xx_ratio - 0.125).abs() < 1e-12);
}

#[test]
fn wrong_container_types_degrade_to_empty() {
    for raw in [json!(null), json!([]), json!({"paths": "none"}), json!({"paths": {"method": "GET"}})] {
        let summary = HttpSummary::normalize(&raw);
        assert!(summary.paths.is_empty());
        assert_eq!(summary.requests_total, 0);
    }
}
