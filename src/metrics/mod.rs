// Private module declaration
mod server;

use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// - Command outcomes and latency (create / cancel / advance)
// - Lookup failures folded into rejections, by collaborator and kind
// - Event publication per channel
// - Circuit breaker state per breaker
// - Component health as seen by the health monitor
//
// Scraped via GET /metrics on the metrics server.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub command_outcomes: IntCounterVec,
    pub command_duration: HistogramVec,
    pub lookup_failures: IntCounterVec,
    pub events_published: IntCounterVec,
    pub events_failed: IntCounterVec,
    pub circuit_breaker_state: IntGaugeVec,
    pub component_health: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let command_outcomes = IntCounterVec::new(
            Opts::new("order_command_outcomes_total", "Order operations by outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(command_outcomes.clone()))?;

        let command_duration = HistogramVec::new(
            HistogramOpts::new("order_command_duration_seconds", "Order operation duration")
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        let lookup_failures = IntCounterVec::new(
            Opts::new("order_lookup_failures_total", "Collaborator lookups that failed or timed out"),
            &["collaborator", "kind"],
        )?;
        registry.register(Box::new(lookup_failures.clone()))?;

        let events_published = IntCounterVec::new(
            Opts::new("order_events_published_total", "Events handed to the broker"),
            &["channel"],
        )?;
        registry.register(Box::new(events_published.clone()))?;

        let events_failed = IntCounterVec::new(
            Opts::new("order_events_failed_total", "Events that could not be published"),
            &["channel"],
        )?;
        registry.register(Box::new(events_failed.clone()))?;

        let circuit_breaker_state = IntGaugeVec::new(
            Opts::new(
                "circuit_breaker_state",
                "Circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
            ),
            &["breaker"],
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new(
                "component_health_status",
                "Component health (0=Unhealthy, 1=Degraded, 2=Healthy)",
            ),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            registry,
            command_outcomes,
            command_duration,
            lookup_failures,
            events_published,
            events_failed,
            circuit_breaker_state,
            component_health,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP. Clones
    /// share the same collectors.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_command(&self, operation: &str, outcome: &str, duration_secs: f64) {
        self.command_outcomes.with_label_values(&[operation, outcome]).inc();
        self.command_duration.with_label_values(&[operation]).observe(duration_secs);
    }

    pub fn record_lookup_failure(&self, collaborator: &str, kind: &str) {
        self.lookup_failures.with_label_values(&[collaborator, kind]).inc();
    }

    pub fn record_publish(&self, channel: &str, success: bool) {
        if success {
            self.events_published.with_label_values(&[channel]).inc();
        } else {
            self.events_failed.with_label_values(&[channel]).inc();
        }
    }

    pub fn update_circuit_breaker_state(&self, breaker: &str, value: i64) {
        self.circuit_breaker_state.with_label_values(&[breaker]).set(value);
    }

    pub fn update_component_health(&self, component: &str, value: i64) {
        self.component_health.with_label_values(&[component]).set(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_command("create", "created", 0.01);
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_command_outcomes() {
        let metrics = Metrics::new().unwrap();
        metrics.record_command("create", "created", 0.02);
        metrics.record_command("create", "rejected", 0.03);
        metrics.record_command("create", "rejected", 0.01);

        assert_eq!(
            metrics.command_outcomes.with_label_values(&["create", "rejected"]).get(),
            2
        );
        assert_eq!(
            metrics.command_duration.with_label_values(&["create"]).get_sample_count(),
            3
        );
    }

    #[test]
    fn test_record_publish_splits_success_and_failure() {
        let metrics = Metrics::new().unwrap();
        metrics.record_publish("produto-atualiza-estoque", true);
        metrics.record_publish("produto-atualiza-estoque", false);
        metrics.record_publish("logistica-prepara-entrega", true);

        assert_eq!(
            metrics.events_published.with_label_values(&["produto-atualiza-estoque"]).get(),
            1
        );
        assert_eq!(
            metrics.events_failed.with_label_values(&["produto-atualiza-estoque"]).get(),
            1
        );
    }

    #[test]
    fn test_gauges() {
        let metrics = Metrics::new().unwrap();
        metrics.update_circuit_breaker_state("redpanda", 1);
        metrics.update_component_health("database", 2);

        assert_eq!(
            metrics.circuit_breaker_state.with_label_values(&["redpanda"]).get(),
            1
        );
        assert_eq!(metrics.component_health.with_label_values(&["database"]).get(), 2);
    }
}
