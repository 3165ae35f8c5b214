use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::{LifecycleSignal, OrderId, OrderStatus, TaxpayerId};

// ============================================================================
// Order Aggregate - Persisted order record and its state machine
// ============================================================================
//
//   Created ──► InTransit ──► Delivered
//      │
//      └──────► Cancelled
//
// Every move is a compare-and-set on (id, from): the store applies it only
// if the row is still in `from`. No transition leaves InTransit except to
// Delivered, and none leaves Delivered or Cancelled.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub taxpayer_id: TaxpayerId,
    pub product_id: i64,
    pub quantity: i64,
    pub status: OrderStatus,
    /// Rewritten on every transition, so it reads as "last written at".
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl Transition {
    pub const CANCEL: Transition = Transition {
        from: OrderStatus::Created,
        to: OrderStatus::Cancelled,
    };

    pub const DISPATCH: Transition = Transition {
        from: OrderStatus::Created,
        to: OrderStatus::InTransit,
    };

    pub const DELIVER: Transition = Transition {
        from: OrderStatus::InTransit,
        to: OrderStatus::Delivered,
    };

    /// Transition requested by a logistics signal, if the signal maps to one.
    pub fn for_signal(signal: LifecycleSignal) -> Option<Transition> {
        match signal {
            LifecycleSignal::InTransit => Some(Self::DISPATCH),
            LifecycleSignal::Delivered => Some(Self::DELIVER),
            LifecycleSignal::Unrecognized => None,
        }
    }

    pub fn applies_to(&self, order: &Order) -> bool {
        order.status == self.from
    }
}

impl Order {
    /// The record as it looks after `transition`, or None if the order is
    /// not in the transition's source status.
    pub fn transitioned(&self, transition: Transition, at: DateTime<Utc>) -> Option<Order> {
        if !transition.applies_to(self) {
            return None;
        }
        Some(Order {
            status: transition.to,
            created_at: at,
            ..self.clone()
        })
    }
}
