use std::sync::Arc;

use async_trait::async_trait;

use super::health::{ComponentHealth, HealthCheckable, HealthStatus};
use crate::metrics::Metrics;
use crate::persistence::OrderRepository;
use crate::utils::{CircuitBreaker, CircuitState};

/// Probes the order store with a round-trip query.
pub struct StoreProbe {
    store: Arc<dyn OrderRepository>,
}

impl StoreProbe {
    pub fn new(store: Arc<dyn OrderRepository>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HealthCheckable for StoreProbe {
    async fn check_health(&self) -> ComponentHealth {
        match self.store.ping().await {
            Ok(()) => ComponentHealth::new(self.component_name(), HealthStatus::Healthy),
            Err(e) => ComponentHealth::new(
                self.component_name(),
                HealthStatus::Unhealthy(format!("store unreachable: {e:#}")),
            ),
        }
    }

    fn component_name(&self) -> &str {
        "database"
    }
}

/// Reports a remote collaborator's health from its circuit breaker, and
/// mirrors the breaker state onto the `circuit_breaker_state` gauge.
pub struct CircuitBreakerProbe {
    breaker: CircuitBreaker,
    metrics: Option<Arc<Metrics>>,
}

impl CircuitBreakerProbe {
    pub fn new(breaker: CircuitBreaker, metrics: Option<Arc<Metrics>>) -> Self {
        Self { breaker, metrics }
    }
}

#[async_trait]
impl HealthCheckable for CircuitBreakerProbe {
    async fn check_health(&self) -> ComponentHealth {
        let state = self.breaker.state().await;
        if let Some(metrics) = &self.metrics {
            metrics.update_circuit_breaker_state(self.breaker.name(), state.gauge_value());
        }

        let status = match state {
            CircuitState::Closed => HealthStatus::Healthy,
            CircuitState::HalfOpen => HealthStatus::Degraded("Circuit breaker half-open".to_string()),
            CircuitState::Open => HealthStatus::Unhealthy("Circuit breaker open".to_string()),
        };
        ComponentHealth::new(self.component_name(), status).with_details(state.as_str())
    }

    fn component_name(&self) -> &str {
        self.breaker.name()
    }
}
