use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    message::{Header, OwnedHeaders},
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};
use uuid::Uuid;

use super::{EventPublisher, OutboundMessage};
use crate::utils::{
    retry_with_backoff, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, RetryConfig,
};

pub struct RedpandaClient {
    producer: FutureProducer,
    circuit_breaker: CircuitBreaker,
    retry: RetryConfig,
    send_timeout: Duration,
}

impl RedpandaClient {
    pub fn new(brokers: &str, message_timeout: Duration, retry: RetryConfig) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", message_timeout.as_millis().to_string())
            .set("acks", "all")
            .create()
            .context("creating Redpanda producer")?;

        // Open after 5 failures, wait 30s, need 3 successes to close
        let cb_config = CircuitBreakerConfig {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(30),
            success_threshold: 3,
        };

        Ok(Self {
            producer,
            circuit_breaker: CircuitBreaker::new("redpanda", cb_config),
            retry,
            send_timeout: message_timeout,
        })
    }

    async fn send_once(&self, message: &OutboundMessage, event_id: &str) -> Result<()> {
        let result = self
            .circuit_breaker
            .call(async {
                let headers = OwnedHeaders::new()
                    .insert(Header { key: "event-id", value: Some(event_id) })
                    .insert(Header { key: "event-type", value: Some(message.event_type) });

                let record = FutureRecord::to(&message.channel)
                    .key(&message.key)
                    .payload(&message.payload)
                    .headers(headers);

                self.producer
                    .send(record, Timeout::After(self.send_timeout))
                    .await
                    .map_err(|(e, _)| anyhow!("Kafka send error: {}", e))?;

                Ok::<(), anyhow::Error>(())
            })
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(CircuitBreakerError::CircuitOpen) => {
                tracing::error!(topic = %message.channel, "Circuit breaker open - Redpanda unavailable");
                bail!("Circuit breaker open for Redpanda")
            }
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
        }
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }
}

#[async_trait]
impl EventPublisher for RedpandaClient {
    async fn publish(&self, message: OutboundMessage) -> Result<()> {
        // one event id across all attempts
        let event_id = Uuid::now_v7().to_string();

        let result = retry_with_backoff("redpanda_publish", &self.retry, |_attempt| {
            self.send_once(&message, &event_id)
        })
        .await;

        match &result {
            Ok(()) => tracing::info!(
                topic = %message.channel,
                key = %message.key,
                event_type = message.event_type,
                event_id = %event_id,
                "Published to Redpanda"
            ),
            Err(e) => tracing::error!(
                error = %e,
                topic = %message.channel,
                event_id = %event_id,
                "Failed to publish to Redpanda"
            ),
        }
        result
    }
}
