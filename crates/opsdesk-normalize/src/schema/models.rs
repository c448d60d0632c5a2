use serde::Serialize;
use serde_json::Value;

use super::{NormalizeRow, NormalizeSnapshot};
use crate::pick::{field, field_any, pick_boolean, pick_count, pick_number, pick_string, rows};

/// Catalog entry for an AI model exposed through the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiModel {
    pub id: String,
    pub provider: Option<String>,
    pub display_name: String,
    pub context_window: u64,
    pub input_price_per_mtok: f64,
    pub output_price_per_mtok: f64,
    pub enabled: bool,
}

impl NormalizeRow for AiModel {
    fn normalize_row(value: &Value) -> Option<Self> {
        let id = pick_string(field_any(value, &["id", "model_id"]))?;
        let display_name = pick_string(field_any(value, &["display_name", "name"]))
            .unwrap_or_else(|| id.clone());
        Some(Self {
            provider: pick_string(field(value, "provider")),
            display_name,
            context_window: pick_count(field(value, "context_window")).unwrap_or(0),
            input_price_per_mtok: price(field(value, "input_price_per_mtok")),
            output_price_per_mtok: price(field(value, "output_price_per_mtok")),
            enabled: pick_boolean(field(value, "enabled")).unwrap_or(false),
            id,
        })
    }
}

fn price(value: Option<&Value>) -> f64 {
    pick_number(value).filter(|p| *p >= 0.0).unwrap_or(0.0)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelCatalog {
    pub models: Vec<AiModel>,
}

impl NormalizeSnapshot for ModelCatalog {
    fn normalize(value: &Value) -> Self {
        Self {
            models: AiModel::normalize_rows(rows(value, &["models", "items"])),
        }
    }
}

impl ModelCatalog {
    pub fn enabled(&self) -> impl Iterator<Item = &AiModel> {
        self.models.iter().filter(|m| m.enabled)
    }
}
