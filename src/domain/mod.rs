// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// order/    - the order lifecycle: validation, state machine, command handler
// customer/ - read-only customer profile returned by the directory lookup
//
// Collaborator ports (store, lookups, publisher) live next to their
// adapters in persistence/, clients/ and messaging/.
//
// ============================================================================

pub mod order;
pub mod customer;
