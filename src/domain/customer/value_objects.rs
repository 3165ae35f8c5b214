use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ============================================================================
// Customer Value Objects
// ============================================================================
//
// Read-only view of a customer as returned by the customer directory.
// Only its presence gates order creation; the attributes are logged.
//
// ============================================================================

/// Customer address as held by the customer directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(rename = "enderecoLogradouro", default)]
    pub street: Option<String>,
    #[serde(rename = "enderecoNumero", default)]
    pub number: Option<i32>,
    #[serde(rename = "enderecoSiglaEstado", default)]
    pub state: Option<String>,
}

/// Customer profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    #[serde(rename = "cpf", default)]
    pub taxpayer_id: Option<String>,
    #[serde(rename = "nome", default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub address: Address,
    #[serde(rename = "dataDeCriacao", default)]
    pub registered_at: Option<NaiveDateTime>,
}

impl CustomerProfile {
    pub fn new(taxpayer_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            taxpayer_id: Some(taxpayer_id.into()),
            name: Some(name.into()),
            address: Address::default(),
            registered_at: None,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
