use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::{CustomerLookup, StockLookup};
use crate::domain::customer::CustomerProfile;
use crate::domain::order::TaxpayerId;

// ============================================================================
// In-Memory Lookup Stubs
// ============================================================================

/// Canned behaviour of a stubbed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubAnswer {
    Yes,
    No,
    /// Indeterminate: the collaborator answered without a verdict
    Absent,
    Fail,
    /// Never answers within any reasonable timeout
    Hang,
}

async fn hang() {
    tokio::time::sleep(Duration::from_secs(3600)).await;
}

pub struct StubCustomerLookup {
    answer: StubAnswer,
    calls: AtomicUsize,
}

impl StubCustomerLookup {
    pub fn new(answer: StubAnswer) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn found() -> Self {
        Self::new(StubAnswer::Yes)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CustomerLookup for StubCustomerLookup {
    async fn find(&self, taxpayer_id: &TaxpayerId) -> Result<Option<CustomerProfile>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answer {
            StubAnswer::Yes => Ok(Some(CustomerProfile::new(taxpayer_id.as_str(), "Stub Customer"))),
            StubAnswer::No | StubAnswer::Absent => Ok(None),
            StubAnswer::Fail => bail!("customer service unreachable"),
            StubAnswer::Hang => {
                hang().await;
                Ok(None)
            }
        }
    }
}

pub struct StubStockLookup {
    answer: StubAnswer,
    calls: AtomicUsize,
}

impl StubStockLookup {
    pub fn new(answer: StubAnswer) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn available() -> Self {
        Self::new(StubAnswer::Yes)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StockLookup for StubStockLookup {
    async fn has_stock(&self, _product_id: i64, _quantity: i64) -> Result<Option<bool>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answer {
            StubAnswer::Yes => Ok(Some(true)),
            StubAnswer::No => Ok(Some(false)),
            StubAnswer::Absent => Ok(None),
            StubAnswer::Fail => bail!("product service unreachable"),
            StubAnswer::Hang => {
                hang().await;
                Ok(None)
            }
        }
    }
}
