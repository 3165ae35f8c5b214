use serde::{Deserialize, Serialize};

use super::aggregate::Order;
use super::value_objects::{LifecycleSignal, OrderId, StockDirection, TaxpayerId};

// ============================================================================
// Order Events - Messages exchanged with inventory and logistics
// ============================================================================
//
// Outbound: one fixed payload shape per channel, so plain structs.
// Inbound:  StatusUpdate, published by logistics as deliveries progress.
//
// Field names follow what the downstream services already consume.
//
// ============================================================================

/// Outbound event contract: a payload with a stable type name and the key
/// used to partition it on the broker.
pub trait OutboundEvent: Serialize {
    fn event_type() -> &'static str
    where
        Self: Sized;

    fn partition_key(&self) -> String;
}

/// Stock Adjustment - asks inventory to withdraw or return units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    #[serde(rename = "ean")]
    pub product_id: i64,
    #[serde(rename = "quantidade")]
    pub quantity: i64,
    #[serde(rename = "statusEstoque")]
    pub direction: StockDirection,
}

impl StockAdjustment {
    pub fn withdraw(product_id: i64, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
            direction: StockDirection::Withdraw,
        }
    }

    pub fn restock(product_id: i64, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
            direction: StockDirection::Return,
        }
    }
}

impl OutboundEvent for StockAdjustment {
    fn event_type() -> &'static str { "StockAdjustment" }

    fn partition_key(&self) -> String {
        self.product_id.to_string()
    }
}

/// Delivery Preparation - asks logistics to prepare shipment of a new order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPreparation {
    #[serde(rename = "idDoPedido")]
    pub order_id: OrderId,
    #[serde(rename = "cpfCliente")]
    pub taxpayer_id: TaxpayerId,
    #[serde(rename = "ean")]
    pub product_id: i64,
    #[serde(rename = "quantidade")]
    pub quantity: i64,
}

impl From<&Order> for DeliveryPreparation {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            taxpayer_id: order.taxpayer_id.clone(),
            product_id: order.product_id,
            quantity: order.quantity,
        }
    }
}

impl OutboundEvent for DeliveryPreparation {
    fn event_type() -> &'static str { "DeliveryPreparation" }

    fn partition_key(&self) -> String {
        self.order_id.to_string()
    }
}

/// Delivery Cancellation - tells logistics an order will not ship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCancellation {
    #[serde(rename = "idDoPedido")]
    pub order_id: OrderId,
}

impl OutboundEvent for DeliveryCancellation {
    fn event_type() -> &'static str { "DeliveryCancellation" }

    fn partition_key(&self) -> String {
        self.order_id.to_string()
    }
}

/// Status Update - inbound delivery progress. Both fields are optional so a
/// malformed message still decodes and can be dropped deliberately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    #[serde(rename = "idDoPedido", default)]
    pub order_id: Option<i64>,
    #[serde(rename = "statusEntrega", default)]
    pub signal: Option<LifecycleSignal>,
}

impl StatusUpdate {
    pub fn new(order_id: i64, signal: LifecycleSignal) -> Self {
        Self {
            order_id: Some(order_id),
            signal: Some(signal),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_adjustment_payload_shape() {
        let json = serde_json::to_value(StockAdjustment::withdraw(7894900011517, 3)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ean": 7894900011517i64,
                "quantidade": 3,
                "statusEstoque": "RETIRA_DO_ESTOQUE"
            })
        );
        assert_eq!(StockAdjustment::withdraw(10, 1).partition_key(), "10");
    }

    #[test]
    fn test_delivery_preparation_payload_shape() {
        let event = DeliveryPreparation {
            order_id: OrderId::new(42).unwrap(),
            taxpayer_id: TaxpayerId::parse("716.229.580-04").unwrap(),
            product_id: 7894900011517,
            quantity: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["idDoPedido"], 42);
        assert_eq!(json["cpfCliente"], "716.229.580-04");
        assert_eq!(json["ean"], 7894900011517i64);
        assert_eq!(json["quantidade"], 3);
        assert_eq!(event.partition_key(), "42");
    }

    #[test]
    fn test_delivery_cancellation_payload_shape() {
        let event = DeliveryCancellation { order_id: OrderId::new(9).unwrap() };
        assert_eq!(serde_json::to_string(&event).unwrap(), r#"{"idDoPedido":9}"#);
    }

    #[test]
    fn test_decoding_enforces_identifier_rules() {
        let decoded: DeliveryCancellation = serde_json::from_str(r#"{"idDoPedido":9}"#).unwrap();
        assert_eq!(decoded.order_id.value(), 9);

        assert!(serde_json::from_str::<DeliveryCancellation>(r#"{"idDoPedido":0}"#).is_err());
        assert!(serde_json::from_str::<DeliveryCancellation>(r#"{"idDoPedido":-4}"#).is_err());

        let bad_cpf = r#"{"idDoPedido":1,"cpfCliente":"123","ean":7894900011517,"quantidade":3}"#;
        assert!(serde_json::from_str::<DeliveryPreparation>(bad_cpf).is_err());
    }

    #[test]
    fn test_status_update_tolerates_missing_and_unknown_fields() {
        let update: StatusUpdate =
            serde_json::from_str(r#"{"idDoPedido": 5, "statusEntrega": "EXTRAVIADO"}"#).unwrap();
        assert_eq!(update.order_id, Some(5));
        assert_eq!(update.signal, Some(LifecycleSignal::Unrecognized));

        let update: StatusUpdate = serde_json::from_str("{}").unwrap();
        assert_eq!(update.order_id, None);
        assert_eq!(update.signal, None);
    }
}
