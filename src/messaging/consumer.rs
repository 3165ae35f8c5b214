use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures_util::StreamExt;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    Message,
};
use tracing::{debug, error, info, warn};

use crate::domain::order::{AdvanceOutcome, OrderCommandHandler, StatusUpdate};
use crate::utils::{retry_with_backoff, RetryConfig};

// ============================================================================
// Status Update Consumer
// ============================================================================
//
// Feeds logistics status updates into `OrderCommandHandler::advance`.
// Every message is committed once handled, whatever the outcome:
// - undecodable payloads are dropped
// - ignored updates (unknown id, wrong status, unknown signal) are dropped
// - store failures are retried with backoff, then dropped
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Applied,
    Ignored,
    /// Payload missing or not a status update
    Dropped,
    /// Store kept failing after every retry
    Failed,
}

pub fn decode_status_update(payload: Option<&[u8]>) -> Result<StatusUpdate> {
    let payload = payload.ok_or_else(|| anyhow!("message has no payload"))?;
    serde_json::from_slice(payload).context("decoding status update")
}

/// Broker-independent half of the consumer: decode, apply, classify.
pub struct StatusUpdateProcessor {
    handler: Arc<OrderCommandHandler>,
    retry: RetryConfig,
}

impl StatusUpdateProcessor {
    pub fn new(handler: Arc<OrderCommandHandler>, retry: RetryConfig) -> Self {
        Self { handler, retry }
    }

    pub async fn process(&self, payload: Option<&[u8]>) -> ConsumeOutcome {
        let update = match decode_status_update(payload) {
            Ok(update) => update,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Dropping undecodable status update");
                return ConsumeOutcome::Dropped;
            }
        };

        let result = retry_with_backoff("advance_order", &self.retry, |_attempt| {
            self.handler.advance(update.clone())
        })
        .await;

        match result {
            Ok(AdvanceOutcome::Applied(_)) => ConsumeOutcome::Applied,
            Ok(AdvanceOutcome::Ignored) => ConsumeOutcome::Ignored,
            Err(e) => {
                error!(error = %e, order_id = ?update.order_id, "Status update could not be applied");
                ConsumeOutcome::Failed
            }
        }
    }
}

pub struct StatusUpdateConsumer {
    consumer: StreamConsumer,
    topic: String,
    processor: StatusUpdateProcessor,
}

impl StatusUpdateConsumer {
    pub fn new(
        brokers: &str,
        group_id: &str,
        topic: &str,
        processor: StatusUpdateProcessor,
    ) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .set("enable.partition.eof", "false")
            .create()
            .context("creating status update consumer")?;

        consumer
            .subscribe(&[topic])
            .with_context(|| format!("subscribing to {topic}"))?;

        info!(topic, group_id, manual_commit = true, "Subscribed to status updates");

        Ok(Self {
            consumer,
            topic: topic.to_string(),
            processor,
        })
    }

    /// Consume until the task is aborted.
    pub async fn run(self) {
        let mut stream = self.consumer.stream();

        while let Some(received) = stream.next().await {
            let message = match received {
                Ok(message) => message,
                Err(e) => {
                    warn!(topic = %self.topic, error = %e, "Failed to receive status update");
                    continue;
                }
            };

            let outcome = self.processor.process(message.payload()).await;
            debug!(
                topic = message.topic(),
                partition = message.partition(),
                offset = message.offset(),
                ?outcome,
                "Status update handled"
            );

            if let Err(e) = self.consumer.commit_message(&message, CommitMode::Async) {
                warn!(
                    topic = message.topic(),
                    partition = message.partition(),
                    offset = message.offset(),
                    error = %e,
                    "Failed to commit offset (message may be redelivered)"
                );
            }
        }

        info!(topic = %self.topic, "Status update stream ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::clients::stub::{StubCustomerLookup, StubStockLookup};
    use crate::domain::order::{CreateOrder, CreateOutcome, LifecycleSignal, OrderStatus};
    use crate::messaging::RecordingPublisher;
    use crate::persistence::{InMemoryOrderRepository, OrderRepository};

    fn quick_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    fn processor() -> (StatusUpdateProcessor, Arc<OrderCommandHandler>, Arc<InMemoryOrderRepository>) {
        let store = Arc::new(InMemoryOrderRepository::new());
        let handler = Arc::new(OrderCommandHandler::new(
            store.clone(),
            Arc::new(StubCustomerLookup::found()),
            Arc::new(StubStockLookup::available()),
            Arc::new(RecordingPublisher::new()),
        ));
        (StatusUpdateProcessor::new(handler.clone(), quick_retry()), handler, store)
    }

    #[test]
    fn test_decode_logistics_payload() {
        let update =
            decode_status_update(Some(br#"{"idDoPedido": 12, "statusEntrega": "ENTREGUE"}"#)).unwrap();
        assert_eq!(update, StatusUpdate::new(12, LifecycleSignal::Delivered));

        assert!(decode_status_update(None).is_err());
        assert!(decode_status_update(Some(b"not json")).is_err());
    }

    #[tokio::test]
    async fn test_process_applies_matching_update() {
        let (processor, handler, store) = processor();
        let CreateOutcome::Created(order) = handler
            .create(CreateOrder::new("71622958004", 7894900011517, 3))
            .await
            .unwrap()
        else {
            panic!("expected Created");
        };

        let payload = format!(r#"{{"idDoPedido": {}, "statusEntrega": "EM_TRANSPORTE"}}"#, order.id);
        assert_eq!(processor.process(Some(payload.as_bytes())).await, ConsumeOutcome::Applied);
        assert_eq!(processor.process(Some(payload.as_bytes())).await, ConsumeOutcome::Ignored);

        let stored = store.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::InTransit);
    }

    #[tokio::test]
    async fn test_process_drops_garbage_and_ignores_unknown_signals() {
        let (processor, _, _) = processor();

        assert_eq!(processor.process(None).await, ConsumeOutcome::Dropped);
        assert_eq!(processor.process(Some(b"{oops")).await, ConsumeOutcome::Dropped);
        assert_eq!(
            processor
                .process(Some(br#"{"idDoPedido": 1, "statusEntrega": "EXTRAVIADO"}"#))
                .await,
            ConsumeOutcome::Ignored
        );
        assert_eq!(
            processor.process(Some(br#"{"statusEntrega": "ENTREGUE"}"#)).await,
            ConsumeOutcome::Ignored
        );
    }

    #[tokio::test]
    async fn test_process_reports_failure_after_retries() {
        let (processor, _, store) = processor();
        store.set_unavailable(true).await;

        let outcome = processor
            .process(Some(br#"{"idDoPedido": 1, "statusEntrega": "EM_TRANSPORTE"}"#))
            .await;
        assert_eq!(outcome, ConsumeOutcome::Failed);
    }
}
