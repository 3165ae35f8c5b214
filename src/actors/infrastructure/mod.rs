// ============================================================================
// Infrastructure Actors
// ============================================================================
//
// Actors for system concerns:
// - Health monitoring
// - Coordination and supervision of background work
//
// ============================================================================

// Private module declarations
mod health_monitor;
mod coordinator;

// Re-export for public API
pub use health_monitor::{HealthMonitorActor, UpdateHealth, GetSystemHealth, SystemHealth};
pub use coordinator::{CoordinatorActor, GetHealthMonitor, Shutdown};
