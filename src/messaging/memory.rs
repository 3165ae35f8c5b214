use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{EventPublisher, OutboundMessage};

/// Publisher that keeps every message it accepts, in order. Can be told to
/// reject sends to simulate an unreachable broker.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<OutboundMessage>>,
    failing: AtomicBool,
    rejected: AtomicUsize,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn published(&self) -> Vec<OutboundMessage> {
        self.published.lock().await.clone()
    }

    pub async fn channels(&self) -> Vec<String> {
        self.published.lock().await.iter().map(|m| m.channel.clone()).collect()
    }

    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, message: OutboundMessage) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            bail!("broker unavailable for channel {}", message.channel);
        }
        self.published.lock().await.push(message);
        Ok(())
    }
}
