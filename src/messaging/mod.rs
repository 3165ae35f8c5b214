// ============================================================================
// Messaging - Event channels to inventory and logistics
// ============================================================================
//
// redpanda  - Kafka-protocol producer (circuit breaker + retry)
// consumer  - status-update consumer driving `advance`
// memory    - recording publisher used by tests
//
// Publishing is advisory: callers log and count failures but never undo
// the store write that preceded them.
//
// ============================================================================

mod consumer;
mod memory;
mod redpanda;

use async_trait::async_trait;

use crate::domain::order::OutboundEvent;

pub use consumer::{decode_status_update, ConsumeOutcome, StatusUpdateConsumer, StatusUpdateProcessor};
pub use memory::RecordingPublisher;
pub use redpanda::RedpandaClient;

/// An encoded event addressed to a named channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub channel: String,
    pub key: String,
    pub event_type: &'static str,
    pub payload: Vec<u8>,
}

impl OutboundMessage {
    pub fn encode<E: OutboundEvent>(channel: &str, event: &E) -> Result<Self, serde_json::Error> {
        Ok(Self {
            channel: channel.to_string(),
            key: event.partition_key(),
            event_type: E::event_type(),
            payload: serde_json::to_vec(event)?,
        })
    }

    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, message: OutboundMessage) -> anyhow::Result<()>;
}
