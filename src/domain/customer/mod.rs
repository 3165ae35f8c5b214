// ============================================================================
// Customer Domain
// ============================================================================
//
// Customers are owned by the customer directory service. This module only
// holds the profile shape returned by a lookup.
//
// ============================================================================

pub mod value_objects;

pub use value_objects::*;
