// ============================================================================
// Order Record Store
// ============================================================================
//
// The command handler is the only writer. Status changes go through
// `transition`, a single compare-and-set on (id, from-status): two racing
// cancels, or a cancel racing a dispatch signal, cannot both win.
//
// ============================================================================

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::order::{Order, OrderDetails, OrderId, OrderStatus, Transition};

pub use memory::InMemoryOrderRepository;
pub use postgres::PgOrderRepository;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order in `Created`; the store assigns the id.
    async fn insert(&self, details: &OrderDetails, created_at: DateTime<Utc>) -> anyhow::Result<Order>;

    async fn find_by_id(&self, id: OrderId) -> anyhow::Result<Option<Order>>;

    async fn find_by_id_and_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> anyhow::Result<Option<Order>>;

    /// Move the order from `transition.from` to `transition.to` and stamp
    /// `at`, atomically. Returns the updated record, or None when no order
    /// with that id is currently in `transition.from`.
    async fn transition(
        &self,
        id: OrderId,
        transition: Transition,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Order>>;

    /// Cheap round-trip used by the health probe.
    async fn ping(&self) -> anyhow::Result<()>;
}
