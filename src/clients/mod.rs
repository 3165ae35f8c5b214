// ============================================================================
// Collaborator Lookups
// ============================================================================
//
// Read-only capabilities queried while creating an order:
// - CustomerLookup: does this taxpayer id belong to a known customer?
// - StockLookup:    can the product service cover this quantity?
//
// Production implementations call the collaborating services over HTTP;
// tests use the stubs in `stub`. Errors are returned as-is: folding them
// into a rejection is the command handler's decision.
//
// ============================================================================

mod customer;
mod product;
pub mod stub;

use async_trait::async_trait;

use crate::domain::customer::CustomerProfile;
use crate::domain::order::TaxpayerId;

pub use customer::CustomerServiceClient;
pub use product::ProductServiceClient;

#[async_trait]
pub trait CustomerLookup: Send + Sync {
    /// `Ok(None)` when the directory has no such customer.
    async fn find(&self, taxpayer_id: &TaxpayerId) -> anyhow::Result<Option<CustomerProfile>>;
}

#[async_trait]
pub trait StockLookup: Send + Sync {
    /// `Ok(None)` when the product service gives no answer.
    async fn has_stock(&self, product_id: i64, quantity: i64) -> anyhow::Result<Option<bool>>;
}

/// What a collaborator said, as seen by its circuit breaker: 4xx answers
/// come back as `Refused` so they never count as a failure.
enum Reply<T> {
    Answer(T),
    Refused(reqwest::StatusCode),
}
