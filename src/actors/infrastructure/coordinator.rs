use actix::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::actors::core::{HealthCheckable, HealthStatus};
use crate::messaging::StatusUpdateConsumer;
use crate::metrics::Metrics;
use super::{GetSystemHealth, HealthMonitorActor, UpdateHealth};

// ============================================================================
// Coordinator Actor - Orchestrates background work
// ============================================================================
//
// Responsibilities:
// - Starts the health monitor and the status-update consumer task
// - Probes every dependency on an interval and reports to the monitor
// - Logs aggregate system health
// - Coordinates graceful shutdown
//
// Actor Hierarchy:
//   CoordinatorActor (Supervisor)
//   ├── HealthMonitorActor
//   └── status-update consumer (task)
//
// ============================================================================

const CONSUMER_COMPONENT: &str = "status_consumer";

pub struct CoordinatorActor {
    probes: Vec<Arc<dyn HealthCheckable>>,
    probe_interval: Duration,
    metrics: Option<Arc<Metrics>>,
    consumer: Option<StatusUpdateConsumer>,
    consumer_task: Option<JoinHandle<()>>,
    health_monitor: Option<Addr<HealthMonitorActor>>,
}

impl CoordinatorActor {
    pub fn new(probes: Vec<Arc<dyn HealthCheckable>>, probe_interval: Duration) -> Self {
        Self {
            probes,
            probe_interval,
            metrics: None,
            consumer: None,
            consumer_task: None,
            health_monitor: None,
        }
    }

    pub fn with_consumer(mut self, consumer: StatusUpdateConsumer) -> Self {
        self.consumer = Some(consumer);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn start_children(&mut self) {
        tracing::info!("Starting supervised children");

        let health_monitor = HealthMonitorActor::new(self.metrics.clone()).start();
        self.health_monitor = Some(health_monitor.clone());

        if let Some(consumer) = self.consumer.take() {
            let monitor = health_monitor.clone();
            self.consumer_task = Some(actix::spawn(async move {
                consumer.run().await;
                monitor.do_send(UpdateHealth {
                    component: CONSUMER_COMPONENT.to_string(),
                    status: HealthStatus::Unhealthy("Status update stream ended".to_string()),
                    details: None,
                });
            }));

            health_monitor.do_send(UpdateHealth {
                component: CONSUMER_COMPONENT.to_string(),
                status: HealthStatus::Healthy,
                details: Some("Status update consumer started".to_string()),
            });
        }

        tracing::info!(probes = self.probes.len(), "Coordinator children started");
    }

    fn run_probes(&self) {
        let Some(monitor) = self.health_monitor.clone() else {
            return;
        };
        let probes = self.probes.clone();

        actix::spawn(async move {
            for probe in probes {
                let health = probe.check_health().await;
                monitor.do_send(UpdateHealth::from(health));
            }
        });
    }

    fn log_system_health(&self) {
        let Some(monitor) = self.health_monitor.clone() else {
            return;
        };

        actix::spawn(async move {
            match monitor.send(GetSystemHealth).await {
                Ok(health) => match health.overall_status {
                    HealthStatus::Healthy => {
                        tracing::debug!("System health check: Healthy");
                    }
                    HealthStatus::Degraded(ref msg) => {
                        tracing::warn!("System health check: Degraded - {}", msg);
                    }
                    HealthStatus::Unhealthy(ref msg) => {
                        tracing::error!("System health check: Unhealthy - {}", msg);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to get system health: {}", e);
                }
            }
        });
    }
}

impl Actor for CoordinatorActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("CoordinatorActor started");
        self.start_children();
        self.run_probes();

        ctx.run_interval(self.probe_interval, |act, _ctx| {
            act.run_probes();
            act.log_system_health();
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        tracing::info!("CoordinatorActor stopping - initiating graceful shutdown");
        Running::Stop
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        tracing::info!("CoordinatorActor stopped");
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "()")]
pub struct Shutdown;

impl Handler<Shutdown> for CoordinatorActor {
    type Result = ();

    fn handle(&mut self, _msg: Shutdown, ctx: &mut Self::Context) {
        tracing::info!("Received shutdown signal");

        if let Some(task) = self.consumer_task.take() {
            task.abort();
            tracing::info!("Status update consumer stopped");
        }

        if let Some(ref health_monitor) = self.health_monitor {
            health_monitor.do_send(StopActor);
        }

        ctx.stop();
    }
}

/// Message to gracefully stop an actor
#[derive(Message)]
#[rtype(result = "()")]
struct StopActor;

impl Handler<StopActor> for HealthMonitorActor {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        tracing::info!("HealthMonitorActor received stop signal");
        ctx.stop();
    }
}

// ============================================================================
// Public API for accessing child actors
// ============================================================================

#[derive(Message)]
#[rtype(result = "Option<Addr<HealthMonitorActor>>")]
pub struct GetHealthMonitor;

impl Handler<GetHealthMonitor> for CoordinatorActor {
    type Result = Option<Addr<HealthMonitorActor>>;

    fn handle(&mut self, _: GetHealthMonitor, _: &mut Self::Context) -> Self::Result {
        self.health_monitor.clone()
    }
}
