use serde::{Deserialize, Serialize};

// ============================================================================
// Order Commands - Represent caller intent
// ============================================================================

/// Request to place an order. Every field is optional on the wire so a
/// missing field surfaces as a ValidationError rather than a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOrder {
    #[serde(rename = "ean", default)]
    pub product_id: Option<i64>,
    #[serde(rename = "cpfCliente", default)]
    pub taxpayer_id: Option<String>,
    #[serde(rename = "quantidade", default)]
    pub quantity: Option<i64>,
}

impl CreateOrder {
    pub fn new(taxpayer_id: impl Into<String>, product_id: i64, quantity: i64) -> Self {
        Self {
            product_id: Some(product_id),
            taxpayer_id: Some(taxpayer_id.into()),
            quantity: Some(quantity),
        }
    }
}
