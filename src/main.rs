use actix::prelude::*;
use actix_web::{App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_lifecycle::actors::{
    CircuitBreakerProbe, CoordinatorActor, GetHealthMonitor, HealthCheckable, Shutdown, StoreProbe,
};
use order_lifecycle::api;
use order_lifecycle::clients::{CustomerServiceClient, ProductServiceClient};
use order_lifecycle::config::AppConfig;
use order_lifecycle::domain::order::OrderCommandHandler;
use order_lifecycle::messaging::{RedpandaClient, StatusUpdateConsumer, StatusUpdateProcessor};
use order_lifecycle::metrics::{self, Metrics};
use order_lifecycle::persistence::PgOrderRepository;
use order_lifecycle::utils::CircuitBreakerConfig;

#[actix::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    // RUST_LOG wins over the configured filter
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    tracing::info!("Starting order lifecycle service");

    // === 1. Order store ===
    let store = Arc::new(
        PgOrderRepository::connect(&config.database.url, config.database.max_connections).await?,
    );
    store.migrate().await?;

    // === 2. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Collaborators ===
    let customers = Arc::new(CustomerServiceClient::new(
        &config.customer_service.base_url,
        config.customer_service.timeout(),
        CircuitBreakerConfig::default(),
    )?);
    let stock = Arc::new(ProductServiceClient::new(
        &config.product_service.base_url,
        config.product_service.timeout(),
        CircuitBreakerConfig::default(),
    )?);
    let redpanda = Arc::new(RedpandaClient::new(
        &config.kafka.brokers,
        config.kafka.message_timeout(),
        config.retry.to_retry_config(),
    )?);

    // === 4. Command handler ===
    let handler = Arc::new(
        OrderCommandHandler::new(store.clone(), customers.clone(), stock.clone(), redpanda.clone())
            .with_channels(config.kafka.channels())
            .with_lookup_timeout(config.lookups.timeout())
            .with_metrics(metrics.clone()),
    );

    // === 5. Coordinator: health probes + status-update consumer ===
    let consumer = StatusUpdateConsumer::new(
        &config.kafka.brokers,
        &config.kafka.consumer_group,
        &config.kafka.status_update_topic,
        StatusUpdateProcessor::new(handler.clone(), config.retry.to_retry_config()),
    )?;

    let probes: Vec<Arc<dyn HealthCheckable>> = vec![
        Arc::new(StoreProbe::new(store.clone())),
        Arc::new(CircuitBreakerProbe::new(redpanda.circuit_breaker().clone(), Some(metrics.clone()))),
        Arc::new(CircuitBreakerProbe::new(customers.circuit_breaker().clone(), Some(metrics.clone()))),
        Arc::new(CircuitBreakerProbe::new(stock.circuit_breaker().clone(), Some(metrics.clone()))),
    ];

    let coordinator = CoordinatorActor::new(
        probes,
        std::time::Duration::from_secs(config.metrics.probe_interval_secs),
    )
    .with_consumer(consumer)
    .with_metrics(metrics.clone())
    .start();

    let health_monitor = coordinator
        .send(GetHealthMonitor)
        .await?
        .ok_or_else(|| anyhow::anyhow!("coordinator did not start a health monitor"))?;

    // === 6. HTTP servers ===
    let metrics_server = metrics::start_metrics_server(
        metrics.registry().clone(),
        health_monitor,
        config.metrics.port,
    );

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Starting command API"
    );
    let handler_data = api::handler_data(handler);
    let api_server = HttpServer::new(move || {
        App::new()
            .app_data(handler_data.clone())
            .configure(api::configure)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run();

    let result = tokio::try_join!(api_server, metrics_server);

    tracing::info!("HTTP servers stopped, shutting down");
    coordinator.send(Shutdown).await?;

    result?;
    Ok(())
}
