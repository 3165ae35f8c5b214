// ============================================================================
// Order Domain - Business Logic for the Order Lifecycle
// ============================================================================
//
// - Value objects (TaxpayerId, OrderId, OrderDetails, OrderStatus, signals)
// - Commands (CreateOrder)
// - Events (StockAdjustment, DeliveryPreparation, DeliveryCancellation,
//   StatusUpdate)
// - Errors (ValidationError, OrderError)
// - Aggregate (Order record + Transition table)
// - Command Handler (OrderCommandHandler: create / cancel / advance)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use command_handler::*;
