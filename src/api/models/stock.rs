use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stock entry or exit as listed by `/stock-movements`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovementRecord {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outgoing body of `POST /stock-movements`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovementPayload {
    pub product_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<i64>,
    pub quantity: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
