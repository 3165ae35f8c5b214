// ============================================================================
// Actors Module
// ============================================================================
//
// Actor-based infrastructure for background concerns.
//
// Structure:
// - core/           - Health types, HealthCheckable and its probes
// - infrastructure/ - Concrete actors (HealthMonitor, Coordinator)
//
// Note: Order logic runs in OrderCommandHandler, NOT in actors.
//       Actors are reserved for infrastructure concerns only.
//
// ============================================================================

// Private module declarations
mod core;
mod infrastructure;

pub use core::{
    CircuitBreakerProbe, ComponentHealth, HealthCheckable, HealthStatus, StoreProbe,
};
pub use infrastructure::{
    CoordinatorActor,
    GetHealthMonitor,
    GetSystemHealth,
    HealthMonitorActor,
    Shutdown,
    SystemHealth,
    UpdateHealth,
};
