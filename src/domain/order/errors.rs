// ============================================================================
// Order Errors
// ============================================================================
//
// ValidationError - malformed input, raised before any I/O
// OrderError      - everything the command handler can surface to a caller
//
// Negative business outcomes (customer missing, no stock, wrong status) are
// NOT errors; they are returned as outcome enums by the command handler.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Customer taxpayer id cannot be empty")]
    EmptyTaxpayerId,

    #[error("Invalid customer taxpayer id: {0}")]
    InvalidTaxpayerId(String),

    #[error("Product identifier must be greater than zero, got {0:?}")]
    InvalidProductId(Option<i64>),

    #[error("Quantity must be between 1 and 1000, got {0:?}")]
    InvalidQuantity(Option<i64>),

    #[error("Order identifier must be greater than zero, got {0:?}")]
    InvalidOrderId(Option<i64>),
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Order store failure: {0:#}")]
    Store(anyhow::Error),

    #[error("Failed to encode event payload: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl OrderError {
    pub fn is_validation(&self) -> bool {
        matches!(self, OrderError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_converts_into_order_error() {
        let err: OrderError = ValidationError::InvalidQuantity(Some(1001)).into();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Quantity must be between 1 and 1000, got Some(1001)");
    }

    #[test]
    fn test_store_error_keeps_context_chain() {
        let cause = anyhow::anyhow!("connection reset").context("update orders");
        let err = OrderError::Store(cause);
        assert!(!err.is_validation());
        assert_eq!(err.to_string(), "Order store failure: update orders: connection reset");
    }
}
