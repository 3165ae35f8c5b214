use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::OrderRepository;
use crate::domain::order::{Order, OrderDetails, OrderId, OrderStatus, Transition};

// ============================================================================
// In-Memory Order Store
// ============================================================================
//
// Same contract as the PostgreSQL store, backed by a map behind one lock so
// `transition` is a true compare-and-set. Counts writes for assertions and
// can be switched into a failing mode to exercise store-error paths.
//
// ============================================================================

#[derive(Default)]
pub struct InMemoryOrderRepository {
    state: Mutex<MemoryState>,
    writes: AtomicUsize,
}

#[derive(Default)]
struct MemoryState {
    orders: BTreeMap<OrderId, Order>,
    last_id: i64,
    unavailable: bool,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful inserts and transitions so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Make every subsequent call fail, as a lost connection would.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, details: &OrderDetails, created_at: DateTime<Utc>) -> Result<Order> {
        let mut state = self.state.lock().await;
        if state.unavailable {
            bail!("order store unavailable");
        }

        state.last_id += 1;
        let order = Order {
            id: OrderId::new(state.last_id)?,
            taxpayer_id: details.taxpayer_id.clone(),
            product_id: details.product_id,
            quantity: details.quantity,
            status: OrderStatus::Created,
            created_at,
        };
        state.orders.insert(order.id, order.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(order)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        if state.unavailable {
            bail!("order store unavailable");
        }
        Ok(state.orders.get(&id).cloned())
    }

    async fn find_by_id_and_status(&self, id: OrderId, status: OrderStatus) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        if state.unavailable {
            bail!("order store unavailable");
        }
        Ok(state.orders.get(&id).filter(|o| o.status == status).cloned())
    }

    async fn transition(
        &self,
        id: OrderId,
        transition: Transition,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let mut state = self.state.lock().await;
        if state.unavailable {
            bail!("order store unavailable");
        }

        let Some(updated) = state.orders.get(&id).and_then(|o| o.transitioned(transition, at)) else {
            return Ok(None);
        };

        state.orders.insert(id, updated.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Some(updated))
    }

    async fn ping(&self) -> Result<()> {
        if self.state.lock().await.unavailable {
            bail!("order store unavailable");
        }
        Ok(())
    }
}
