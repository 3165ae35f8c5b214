use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::clients::{CustomerLookup, StockLookup};
use crate::messaging::{EventPublisher, OutboundMessage};
use crate::metrics::Metrics;
use crate::persistence::OrderRepository;

use super::aggregate::{Order, Transition};
use super::commands::CreateOrder;
use super::errors::OrderError;
use super::events::{
    DeliveryCancellation, DeliveryPreparation, OutboundEvent, StatusUpdate, StockAdjustment,
};
use super::value_objects::{OrderDetails, OrderId, OrderStatus, TaxpayerId};

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Command → Lookups → Store (compare-and-set) → Events
//
//   create   validate, customer lookup, stock lookup, insert, then
//            stock withdrawal + delivery preparation
//   cancel   Created → Cancelled, then stock return + delivery cancellation
//   advance  status update from logistics, store only, never emits
//
// Lookup failures and timeouts are folded into a rejection. Publish
// failures are logged and counted; the store write stands.
//
// ============================================================================

/// Outbound channel names, one per event shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channels {
    pub stock_adjustment: String,
    pub delivery_preparation: String,
    pub delivery_cancellation: String,
}

impl Default for Channels {
    fn default() -> Self {
        Self {
            stock_adjustment: "produto-atualiza-estoque".to_string(),
            delivery_preparation: "logistica-prepara-entrega".to_string(),
            delivery_cancellation: "logistica-cancela-entrega".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No such customer, or the customer directory could not answer
    CustomerNotFound,
    /// Insufficient, indeterminate, or unavailable stock answer
    StockUnavailable,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::CustomerNotFound => "customer_not_found",
            RejectReason::StockUnavailable => "stock_unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Order),
    Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled(Order),
    /// Unknown id, or the order is no longer in Created
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Applied(Order),
    Ignored,
}

pub struct OrderCommandHandler {
    store: Arc<dyn OrderRepository>,
    customers: Arc<dyn CustomerLookup>,
    stock: Arc<dyn StockLookup>,
    publisher: Arc<dyn EventPublisher>,
    channels: Channels,
    lookup_timeout: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl OrderCommandHandler {
    pub fn new(
        store: Arc<dyn OrderRepository>,
        customers: Arc<dyn CustomerLookup>,
        stock: Arc<dyn StockLookup>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            customers,
            stock,
            publisher,
            channels: Channels::default(),
            lookup_timeout: Duration::from_secs(5),
            metrics: None,
        }
    }

    pub fn with_channels(mut self, channels: Channels) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn channels(&self) -> &Channels {
        &self.channels
    }

    // ========================================================================
    // create
    // ========================================================================

    #[instrument(skip(self, command))]
    pub async fn create(&self, command: CreateOrder) -> Result<CreateOutcome, OrderError> {
        let started = Instant::now();
        let result = self.try_create(command).await;

        let outcome = match &result {
            Ok(CreateOutcome::Created(_)) => "created",
            Ok(CreateOutcome::Rejected(_)) => "rejected",
            Err(e) if e.is_validation() => "invalid",
            Err(_) => "error",
        };
        self.record_command("create", outcome, started);
        result
    }

    async fn try_create(&self, command: CreateOrder) -> Result<CreateOutcome, OrderError> {
        let details = OrderDetails::try_from(command)?;

        if !self.customer_exists(&details.taxpayer_id).await {
            info!(taxpayer_id = %details.taxpayer_id, "Order rejected: customer not found");
            return Ok(CreateOutcome::Rejected(RejectReason::CustomerNotFound));
        }

        if !self.stock_available(details.product_id, details.quantity).await {
            info!(
                product_id = details.product_id,
                quantity = details.quantity,
                "Order rejected: stock unavailable"
            );
            return Ok(CreateOutcome::Rejected(RejectReason::StockUnavailable));
        }

        let order = self
            .store
            .insert(&details, Utc::now())
            .await
            .map_err(OrderError::Store)?;

        info!(order_id = %order.id, product_id = order.product_id, "Order created");

        self.emit(
            &self.channels.stock_adjustment,
            &StockAdjustment::withdraw(order.product_id, order.quantity),
        )
        .await?;
        self.emit(
            &self.channels.delivery_preparation,
            &DeliveryPreparation::from(&order),
        )
        .await?;

        Ok(CreateOutcome::Created(order))
    }

    async fn customer_exists(&self, taxpayer_id: &TaxpayerId) -> bool {
        match timeout(self.lookup_timeout, self.customers.find(taxpayer_id)).await {
            Ok(Ok(found)) => found.is_some(),
            Ok(Err(e)) => {
                warn!(error = %e, taxpayer_id = %taxpayer_id, "Customer lookup failed");
                self.record_lookup_failure("customer_service", "error");
                false
            }
            Err(_) => {
                warn!(
                    taxpayer_id = %taxpayer_id,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Customer lookup timed out"
                );
                self.record_lookup_failure("customer_service", "timeout");
                false
            }
        }
    }

    async fn stock_available(&self, product_id: i64, quantity: i64) -> bool {
        match timeout(self.lookup_timeout, self.stock.has_stock(product_id, quantity)).await {
            Ok(Ok(answer)) => answer == Some(true),
            Ok(Err(e)) => {
                warn!(error = %e, product_id, "Stock lookup failed");
                self.record_lookup_failure("product_service", "error");
                false
            }
            Err(_) => {
                warn!(
                    product_id,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Stock lookup timed out"
                );
                self.record_lookup_failure("product_service", "timeout");
                false
            }
        }
    }

    // ========================================================================
    // cancel
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: i64) -> Result<CancelOutcome, OrderError> {
        let started = Instant::now();
        let result = self.try_cancel(order_id).await;

        let outcome = match &result {
            Ok(CancelOutcome::Cancelled(_)) => "cancelled",
            Ok(CancelOutcome::NotApplicable) => "not_applicable",
            Err(e) if e.is_validation() => "invalid",
            Err(_) => "error",
        };
        self.record_command("cancel", outcome, started);
        result
    }

    async fn try_cancel(&self, order_id: i64) -> Result<CancelOutcome, OrderError> {
        let id = OrderId::new(order_id)?;

        let Some(order) = self
            .store
            .transition(id, Transition::CANCEL, Utc::now())
            .await
            .map_err(OrderError::Store)?
        else {
            info!(order_id = %id, "Cancel not applicable: no order in CREATED with this id");
            return Ok(CancelOutcome::NotApplicable);
        };

        info!(order_id = %order.id, "Order cancelled");

        self.emit(
            &self.channels.stock_adjustment,
            &StockAdjustment::restock(order.product_id, order.quantity),
        )
        .await?;
        self.emit(
            &self.channels.delivery_cancellation,
            &DeliveryCancellation { order_id: order.id },
        )
        .await?;

        Ok(CancelOutcome::Cancelled(order))
    }

    // ========================================================================
    // advance
    // ========================================================================

    /// Apply a logistics status update. Malformed updates and updates that
    /// do not match the order's current status are ignored, never errors;
    /// only a store failure is returned.
    #[instrument(skip(self))]
    pub async fn advance(&self, update: StatusUpdate) -> Result<AdvanceOutcome, OrderError> {
        let started = Instant::now();
        let result = self.try_advance(update).await;

        let outcome = match &result {
            Ok(AdvanceOutcome::Applied(_)) => "applied",
            Ok(AdvanceOutcome::Ignored) => "ignored",
            Err(_) => "error",
        };
        self.record_command("advance", outcome, started);
        result
    }

    async fn try_advance(&self, update: StatusUpdate) -> Result<AdvanceOutcome, OrderError> {
        let Ok(id) = OrderId::try_from(update.order_id) else {
            info!(order_id = ?update.order_id, "Status update dropped: invalid order id");
            return Ok(AdvanceOutcome::Ignored);
        };

        let Some(transition) = update.signal.and_then(Transition::for_signal) else {
            info!(
                order_id = %id,
                signal = update.signal.map(|s| s.as_str()).unwrap_or("missing"),
                "Status update dropped: unrecognized signal"
            );
            return Ok(AdvanceOutcome::Ignored);
        };

        match self
            .store
            .transition(id, transition, Utc::now())
            .await
            .map_err(OrderError::Store)?
        {
            Some(order) => {
                info!(order_id = %order.id, status = %order.status, "Order status advanced");
                Ok(AdvanceOutcome::Applied(order))
            }
            None => {
                info!(
                    order_id = %id,
                    required = %transition.from,
                    "Status update dropped: no order in required status"
                );
                Ok(AdvanceOutcome::Ignored)
            }
        }
    }

    // ========================================================================
    // queries
    // ========================================================================

    pub async fn find(
        &self,
        order_id: i64,
        status: Option<OrderStatus>,
    ) -> Result<Option<Order>, OrderError> {
        let id = OrderId::new(order_id)?;
        let found = match status {
            Some(status) => self.store.find_by_id_and_status(id, status).await,
            None => self.store.find_by_id(id).await,
        };
        found.map_err(OrderError::Store)
    }

    // ========================================================================
    // helpers
    // ========================================================================

    async fn emit<E>(&self, channel: &str, event: &E) -> Result<(), OrderError>
    where
        E: OutboundEvent + Sync,
    {
        let message = OutboundMessage::encode(channel, event)?;
        let key = message.key.clone();

        match self.publisher.publish(message).await {
            Ok(()) => self.record_publish(channel, true),
            Err(e) => {
                warn!(
                    channel,
                    key = %key,
                    error = %e,
                    "Event publication failed, order state already persisted"
                );
                self.record_publish(channel, false);
            }
        }
        Ok(())
    }

    fn record_command(&self, operation: &str, outcome: &str, started: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics.record_command(operation, outcome, started.elapsed().as_secs_f64());
        }
    }

    fn record_lookup_failure(&self, collaborator: &str, kind: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_lookup_failure(collaborator, kind);
        }
    }

    fn record_publish(&self, channel: &str, success: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_publish(channel, success);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::stub::{StubAnswer, StubCustomerLookup, StubStockLookup};
    use crate::domain::order::{LifecycleSignal, StockDirection, ValidationError};
    use crate::messaging::RecordingPublisher;
    use crate::persistence::InMemoryOrderRepository;

    struct Harness {
        handler: OrderCommandHandler,
        store: Arc<InMemoryOrderRepository>,
        customers: Arc<StubCustomerLookup>,
        stock: Arc<StubStockLookup>,
        publisher: Arc<RecordingPublisher>,
        metrics: Arc<Metrics>,
    }

    fn harness(customer: StubAnswer, stock: StubAnswer) -> Harness {
        let store = Arc::new(InMemoryOrderRepository::new());
        let customers = Arc::new(StubCustomerLookup::new(customer));
        let stock = Arc::new(StubStockLookup::new(stock));
        let publisher = Arc::new(RecordingPublisher::new());
        let metrics = Arc::new(Metrics::new().unwrap());

        let handler = OrderCommandHandler::new(
            store.clone(),
            customers.clone(),
            stock.clone(),
            publisher.clone(),
        )
        .with_lookup_timeout(Duration::from_millis(50))
        .with_metrics(metrics.clone());

        Harness { handler, store, customers, stock, publisher, metrics }
    }

    fn happy() -> Harness {
        harness(StubAnswer::Yes, StubAnswer::Yes)
    }

    fn request() -> CreateOrder {
        CreateOrder::new("71622958004", 7894900011517, 3)
    }

    async fn created(h: &Harness) -> Order {
        match h.handler.create(request()).await.unwrap() {
            CreateOutcome::Created(order) => order,
            other => panic!("expected Created, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_persists_and_emits_withdraw_then_prepare() {
        let h = happy();
        let order = created(&h).await;

        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(h.store.write_count(), 1);

        let published = h.publisher.published().await;
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].channel, "produto-atualiza-estoque");
        assert_eq!(published[1].channel, "logistica-prepara-entrega");

        let withdraw: StockAdjustment = published[0].decode().unwrap();
        assert_eq!(withdraw, StockAdjustment::withdraw(7894900011517, 3));

        let prepare: DeliveryPreparation = published[1].decode().unwrap();
        assert_eq!(prepare.order_id, order.id);
        assert_eq!(prepare.taxpayer_id.as_str(), "71622958004");
        assert_eq!(published[1].key, order.id.to_string());
    }

    #[tokio::test]
    async fn test_create_rejected_for_any_negative_stock_answer() {
        for answer in [StubAnswer::No, StubAnswer::Absent, StubAnswer::Fail, StubAnswer::Hang] {
            let h = harness(StubAnswer::Yes, answer);
            let outcome = h.handler.create(request()).await.unwrap();

            assert_eq!(
                outcome,
                CreateOutcome::Rejected(RejectReason::StockUnavailable),
                "stock answer {answer:?}"
            );
            assert_eq!(h.store.write_count(), 0);
            assert!(h.publisher.published().await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_create_rejected_when_customer_missing_without_checking_stock() {
        for answer in [StubAnswer::No, StubAnswer::Fail, StubAnswer::Hang] {
            let h = harness(answer, StubAnswer::Yes);
            let outcome = h.handler.create(request()).await.unwrap();

            assert_eq!(outcome, CreateOutcome::Rejected(RejectReason::CustomerNotFound));
            assert_eq!(h.customers.calls(), 1);
            assert_eq!(h.stock.calls(), 0);
            assert_eq!(h.store.write_count(), 0);
            assert!(h.publisher.published().await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_lookup_failures_are_counted_by_kind() {
        let h = harness(StubAnswer::Hang, StubAnswer::Yes);
        h.handler.create(request()).await.unwrap();

        let h2 = harness(StubAnswer::Yes, StubAnswer::Fail);
        h2.handler.create(request()).await.unwrap();

        assert_eq!(
            h.metrics.lookup_failures.with_label_values(&["customer_service", "timeout"]).get(),
            1
        );
        assert_eq!(
            h2.metrics.lookup_failures.with_label_values(&["product_service", "error"]).get(),
            1
        );
        assert_eq!(
            h.metrics.command_outcomes.with_label_values(&["create", "rejected"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn test_create_validation_happens_before_any_io() {
        let h = happy();
        let err = h
            .handler
            .create(CreateOrder::new("71622958004", 7894900011517, 1001))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::Validation(ValidationError::InvalidQuantity(Some(1001)))
        ));
        assert_eq!(h.customers.calls(), 0);
        assert_eq!(h.stock.calls(), 0);
        assert_eq!(h.store.write_count(), 0);

        let err = h.handler.create(CreateOrder::default()).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_quantity_upper_boundary_is_accepted() {
        let h = happy();
        let outcome = h
            .handler
            .create(CreateOrder::new("716.229.580-04", 7894900011517, 1000))
            .await
            .unwrap();
        assert!(matches!(outcome, CreateOutcome::Created(_)));
    }

    #[tokio::test]
    async fn test_cancel_created_order_returns_stock_and_cancels_delivery() {
        let h = happy();
        let order = created(&h).await;

        let outcome = h.handler.cancel(order.id.value()).await.unwrap();
        let CancelOutcome::Cancelled(cancelled) = outcome else {
            panic!("expected Cancelled");
        };
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.quantity, order.quantity);

        let published = h.publisher.published().await;
        assert_eq!(published.len(), 4);
        assert_eq!(published[2].channel, "produto-atualiza-estoque");
        assert_eq!(published[3].channel, "logistica-cancela-entrega");

        let restock: StockAdjustment = published[2].decode().unwrap();
        assert_eq!(restock.direction, StockDirection::Return);
        let cancellation: DeliveryCancellation = published[3].decode().unwrap();
        assert_eq!(cancellation.order_id, order.id);
    }

    #[tokio::test]
    async fn test_cancel_unknown_or_advanced_order_is_not_applicable() {
        let h = happy();
        assert_eq!(h.handler.cancel(404).await.unwrap(), CancelOutcome::NotApplicable);

        let order = created(&h).await;
        h.handler
            .advance(StatusUpdate::new(order.id.value(), LifecycleSignal::InTransit))
            .await
            .unwrap();
        let writes = h.store.write_count();

        assert_eq!(h.handler.cancel(order.id.value()).await.unwrap(), CancelOutcome::NotApplicable);
        assert_eq!(h.store.write_count(), writes);
        assert_eq!(h.publisher.published().await.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_rejects_invalid_id() {
        let h = happy();
        let err = h.handler.cancel(0).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::Validation(ValidationError::InvalidOrderId(Some(0)))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_cancels_emit_once() {
        let h = Arc::new(happy());
        let order = created(&h).await;

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let h = h.clone();
                tokio::spawn(async move { h.handler.cancel(order.id.value()).await.unwrap() })
            })
            .collect();

        let mut cancelled = 0;
        for task in tasks {
            if matches!(task.await.unwrap(), CancelOutcome::Cancelled(_)) {
                cancelled += 1;
            }
        }
        assert_eq!(cancelled, 1);
        assert_eq!(h.publisher.published().await.len(), 4);
    }

    #[tokio::test]
    async fn test_advance_follows_the_state_machine() {
        let h = happy();
        let order = created(&h).await;
        let id = order.id.value();

        // Delivered before InTransit is ignored
        let outcome = h
            .handler
            .advance(StatusUpdate::new(id, LifecycleSignal::Delivered))
            .await
            .unwrap();
        assert_eq!(outcome, AdvanceOutcome::Ignored);

        let outcome = h
            .handler
            .advance(StatusUpdate::new(id, LifecycleSignal::InTransit))
            .await
            .unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Applied(ref o) if o.status == OrderStatus::InTransit));

        let outcome = h
            .handler
            .advance(StatusUpdate::new(id, LifecycleSignal::Delivered))
            .await
            .unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Applied(ref o) if o.status == OrderStatus::Delivered));

        // advancing never emits
        assert_eq!(h.publisher.published().await.len(), 2);
    }

    #[tokio::test]
    async fn test_replayed_status_update_is_a_no_op() {
        let h = happy();
        let order = created(&h).await;
        let update = StatusUpdate::new(order.id.value(), LifecycleSignal::InTransit);

        assert!(matches!(h.handler.advance(update.clone()).await.unwrap(), AdvanceOutcome::Applied(_)));
        let writes = h.store.write_count();

        assert_eq!(h.handler.advance(update).await.unwrap(), AdvanceOutcome::Ignored);
        assert_eq!(h.store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_malformed_status_updates_are_ignored() {
        let h = happy();
        let order = created(&h).await;

        let updates = [
            StatusUpdate { order_id: None, signal: Some(LifecycleSignal::InTransit) },
            StatusUpdate { order_id: Some(-1), signal: Some(LifecycleSignal::InTransit) },
            StatusUpdate { order_id: Some(order.id.value()), signal: None },
            StatusUpdate::new(order.id.value(), LifecycleSignal::Unrecognized),
            StatusUpdate::new(999, LifecycleSignal::InTransit),
        ];
        for update in updates {
            assert_eq!(h.handler.advance(update).await.unwrap(), AdvanceOutcome::Ignored);
        }
        assert_eq!(h.store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_change_outcome() {
        let h = happy();
        h.publisher.set_failing(true);

        let outcome = h.handler.create(request()).await.unwrap();
        assert!(matches!(outcome, CreateOutcome::Created(_)));
        assert_eq!(h.store.write_count(), 1);
        assert_eq!(h.publisher.rejected(), 2);
        assert_eq!(
            h.metrics.events_failed.with_label_values(&["logistica-prepara-entrega"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_store_error() {
        let h = happy();
        h.store.set_unavailable(true).await;

        let err = h.handler.create(request()).await.unwrap_err();
        assert!(matches!(err, OrderError::Store(_)));
        assert!(h.publisher.published().await.is_empty());

        let err = h
            .handler
            .advance(StatusUpdate::new(1, LifecycleSignal::InTransit))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Store(_)));
    }

    #[tokio::test]
    async fn test_find_with_and_without_status() {
        let h = happy();
        let order = created(&h).await;

        assert_eq!(h.handler.find(order.id.value(), None).await.unwrap(), Some(order.clone()));
        assert!(h
            .handler
            .find(order.id.value(), Some(OrderStatus::Delivered))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_custom_channels_are_used() {
        let h = happy();
        let handler = OrderCommandHandler::new(
            h.store.clone(),
            h.customers.clone(),
            h.stock.clone(),
            h.publisher.clone(),
        )
        .with_channels(Channels {
            stock_adjustment: "stock".to_string(),
            delivery_preparation: "prepare".to_string(),
            delivery_cancellation: "cancel".to_string(),
        });

        handler.create(request()).await.unwrap();
        assert_eq!(h.publisher.channels().await, vec!["stock", "prepare"]);
    }

    #[tokio::test]
    async fn test_order_lifecycle_scenario() {
        let h = happy();

        let order = created(&h).await;
        assert_eq!(order.product_id, 7894900011517);
        assert_eq!(h.publisher.published().await.len(), 2);

        let outcome = h.handler.cancel(order.id.value()).await.unwrap();
        assert!(matches!(outcome, CancelOutcome::Cancelled(ref o) if o.status == OrderStatus::Cancelled));
        assert_eq!(h.publisher.published().await.len(), 4);
        assert_eq!(h.store.write_count(), 2);

        assert_eq!(h.handler.cancel(order.id.value()).await.unwrap(), CancelOutcome::NotApplicable);
        assert_eq!(h.publisher.published().await.len(), 4);
        assert_eq!(h.store.write_count(), 2);
    }
}
