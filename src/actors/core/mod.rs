// ============================================================================
// Core Actor Abstractions
// ============================================================================
//
// Health types shared by the monitor, the coordinator and the probes
// it runs against each dependency.
//
// ============================================================================

pub mod health;
pub mod probes;

// Re-export core types
pub use health::*;
pub use probes::*;
