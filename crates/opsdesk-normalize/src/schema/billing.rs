use serde::Serialize;
use serde_json::Value;

use super::{NormalizeRow, NormalizeSnapshot};
use crate::pick::{field, field_any, pick_count, pick_string, rows, unwrap_envelope};

const DEFAULT_CURRENCY: &str = "USD";

/// An invoice row. Both the invoice id and the customer identify it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    pub id: String,
    pub customer: String,
    pub amount_cents: u64,
    pub currency: String,
    pub status: String,
    pub issued_at: Option<String>,
}

impl NormalizeRow for Invoice {
    fn normalize_row(value: &Value) -> Option<Self> {
        let id = pick_string(field(value, "id"))?;
        let customer = pick_string(field_any(value, &["customer", "customer_id"]))?;
        Some(Self {
            id,
            customer,
            amount_cents: pick_count(field(value, "amount_cents")).unwrap_or(0),
            currency: currency(field(value, "currency")),
            status: pick_string(field(value, "status"))
                .map(|s| s.to_ascii_lowercase())
                .unwrap_or_else(|| "draft".into()),
            issued_at: pick_string(field(value, "issued_at")),
        })
    }
}

fn currency(value: Option<&Value>) -> String {
    pick_string(value)
        .filter(|c| c.len() == 3 && c.chars().all(|ch| ch.is_ascii_alphabetic()))
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingOverview {
    pub currency: String,
    pub mrr_cents: u64,
    pub invoices: Vec<Invoice>,
}

impl Default for BillingOverview {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            mrr_cents: 0,
            invoices: Vec::new(),
        }
    }
}

impl NormalizeSnapshot for BillingOverview {
    fn normalize(value: &Value) -> Self {
        let invoices = Invoice::normalize_rows(rows(value, &["invoices", "items"]));
        let value = unwrap_envelope(value);
        Self {
            currency: currency(field(value, "currency")),
            mrr_cents: pick_count(field(value, "mrr_cents")).unwrap_or(0),
            invoices,
        }
    }
}

impl BillingOverview {
    pub fn outstanding_cents(&self) -> u64 {
        self.invoices
            .iter()
            .filter(|i| i.status == "open" || i.status == "overdue")
            .map(|i| i.amount_cents)
            .fold(0u64, u64::saturating_add)
    }
}
