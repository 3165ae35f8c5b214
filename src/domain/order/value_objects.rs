use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::commands::CreateOrder;
use super::errors::ValidationError;

// ============================================================================
// Order Value Objects
// ============================================================================
//
// Validation happens once, at construction. Anything holding an OrderId or
// OrderDetails can rely on the invariants without re-checking them, whether
// it came in through the HTTP command path or the status-update consumer.
//
// ============================================================================

/// Upper bound (inclusive) for the quantity of a single order.
pub const MAX_QUANTITY: i64 = 1000;

/// Eleven digits, optionally grouped as `000.000.000-00`.
static TAXPAYER_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{3}\.?[0-9]{3}\.?[0-9]{3}-?[0-9]{2}$").expect("taxpayer id pattern compiles")
});

/// National taxpayer id identifying the customer (kept as submitted,
/// punctuation included).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxpayerId(String);

impl TaxpayerId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.is_empty() {
            return Err(ValidationError::EmptyTaxpayerId);
        }
        if !TAXPAYER_ID_PATTERN.is_match(raw) {
            return Err(ValidationError::InvalidTaxpayerId(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaxpayerId {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<TaxpayerId> for String {
    fn from(id: TaxpayerId) -> Self {
        id.0
    }
}

impl fmt::Display for TaxpayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned order identifier. Always `> 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct OrderId(i64);

impl OrderId {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value <= 0 {
            return Err(ValidationError::InvalidOrderId(Some(value)));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for OrderId {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderId> for i64 {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

impl TryFrom<Option<i64>> for OrderId {
    type Error = ValidationError;

    fn try_from(value: Option<i64>) -> Result<Self, Self::Error> {
        match value {
            Some(v) => Self::new(v),
            None => Err(ValidationError::InvalidOrderId(None)),
        }
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The validated fields of an order request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetails {
    pub taxpayer_id: TaxpayerId,
    pub product_id: i64,
    pub quantity: i64,
}

impl OrderDetails {
    pub fn new(taxpayer_id: &str, product_id: i64, quantity: i64) -> Result<Self, ValidationError> {
        Self::try_from(CreateOrder {
            product_id: Some(product_id),
            taxpayer_id: Some(taxpayer_id.to_string()),
            quantity: Some(quantity),
        })
    }
}

impl TryFrom<CreateOrder> for OrderDetails {
    type Error = ValidationError;

    fn try_from(command: CreateOrder) -> Result<Self, Self::Error> {
        let taxpayer_id = command.taxpayer_id.ok_or(ValidationError::EmptyTaxpayerId)?;
        let taxpayer_id = TaxpayerId::parse(&taxpayer_id)?;

        let product_id = match command.product_id {
            Some(id) if id > 0 => id,
            other => return Err(ValidationError::InvalidProductId(other)),
        };

        let quantity = match command.quantity {
            Some(q) if (1..=MAX_QUANTITY).contains(&q) => q,
            other => return Err(ValidationError::InvalidQuantity(other)),
        };

        Ok(Self {
            taxpayer_id,
            product_id,
            quantity,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::InTransit => "IN_TRANSIT",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CREATED" => Some(OrderStatus::Created),
            "IN_TRANSIT" => Some(OrderStatus::InTransit),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery signal sent by logistics. Values we do not know about are kept
/// as `Unrecognized` so the consumer can drop them without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleSignal {
    #[serde(rename = "EM_TRANSPORTE", alias = "IN_TRANSIT")]
    InTransit,
    #[serde(rename = "ENTREGUE", alias = "DELIVERED")]
    Delivered,
    #[serde(other)]
    Unrecognized,
}

impl LifecycleSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleSignal::InTransit => "in_transit",
            LifecycleSignal::Delivered => "delivered",
            LifecycleSignal::Unrecognized => "unrecognized",
        }
    }
}

/// Which way a stock adjustment moves units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockDirection {
    #[serde(rename = "RETIRA_DO_ESTOQUE")]
    Withdraw,
    #[serde(rename = "VOLTA_PARA_O_ESTOQUE")]
    Return,
}

// ============================================================================
// Unit Tests
// ============================================================================
