use serde::Serialize;
use serde_json::Value;

use super::{NormalizeRow, NormalizeSnapshot};
use crate::pick::{
    field, field_any, pick_count, pick_number, pick_string, rows, sum_counts, unwrap_envelope,
};

/// Call statistics for one model. Rows without a model name are dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmCallMetric {
    pub model: String,
    pub provider: Option<String>,
    pub calls_total: u64,
    pub errors_total: u64,
    pub avg_latency_ms: f64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

impl LlmCallMetric {
    pub fn tokens_total(&self) -> u64 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }

    pub fn error_rate(&self) -> f64 {
        if self.calls_total == 0 {
            0.0
        } else {
            self.errors_total as f64 / self.calls_total as f64
        }
    }
}

impl NormalizeRow for LlmCallMetric {
    fn normalize_row(value: &Value) -> Option<Self> {
        let model = pick_string(field_any(value, &["model", "model_id"]))?;
        Some(Self {
            model,
            provider: pick_string(field(value, "provider")),
            calls_total: pick_count(field_any(value, &["calls_total", "calls"])).unwrap_or(0),
            errors_total: pick_count(field_any(value, &["errors_total", "errors"])).unwrap_or(0),
            avg_latency_ms: pick_number(field(value, "avg_latency_ms")).unwrap_or(0.0),
            prompt_tokens: pick_count(field(value, "prompt_tokens")).unwrap_or(0),
            completion_tokens: pick_count(field(value, "completion_tokens")).unwrap_or(0),
            cost_usd: pick_number(field(value, "cost_usd"))
                .filter(|c| *c >= 0.0)
                .unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LlmSummary {
    pub calls_total: u64,
    pub errors_total: u64,
    pub tokens_total: u64,
    pub cost_usd: f64,
    pub by_model: Vec<LlmCallMetric>,
    pub updated_at: Option<String>,
}

impl NormalizeSnapshot for LlmSummary {
    fn normalize(value: &Value) -> Self {
        let value = unwrap_envelope(value);
        let by_model = LlmCallMetric::normalize_rows(rows(value, &["by_model", "models", "calls"]));
        let totals = match field(value, "totals") {
            Some(t) if t.is_object() => t,
            _ => value,
        };
        Self {
            calls_total: pick_count(field(totals, "calls_total"))
                .unwrap_or_else(|| sum_counts(by_model.iter().map(|m| m.calls_total))),
            errors_total: pick_count(field(totals, "errors_total"))
                .unwrap_or_else(|| sum_counts(by_model.iter().map(|m| m.errors_total))),
            tokens_total: pick_count(field(totals, "tokens_total"))
                .unwrap_or_else(|| {
                    sum_counts(by_model.iter().map(LlmCallMetric::tokens_total))
                }),
            cost_usd: pick_number(field(totals, "cost_usd"))
                .unwrap_or_else(|| by_model.iter().map(|m| m.cost_usd).sum()),
            updated_at: pick_string(field(value, "updated_at")),
            by_model,
        }
    }
}
