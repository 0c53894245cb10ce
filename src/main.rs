//! KEDA HTTP interceptor.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────────┐
//!                 │                      INTERCEPTOR                         │
//!   Client        │  ┌──────────┐   ┌─────────┐   ┌─────────┐   ┌──────────┐ │
//!   ──────────────┼─▶│request-id│──▶│ routing │──▶│counting │──▶│ upstream │─┼──▶ Workload
//!                 │  │ + trace  │   │  table  │   │  queue  │   │ dial/wait│ │    (or failover)
//!                 │  └──────────┘   └────┬────┘   └────┬────┘   └────┬─────┘ │
//!                 │                      │ probe UA    │             │ cold  │
//!                 │                      ▼             ▼             ▼       │
//!                 │                 ┌────────┐   ┌──────────┐  ┌───────────┐ │
//!                 │                 │ probe  │   │  admin   │  │placeholder│ │
//!                 │                 └────────┘   │ /queue   │  └───────────┘ │
//!                 │                              └──────────┘                │
//!                 └──────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use keda_interceptor::admin::{setup_admin_router, AdminState};
use keda_interceptor::config::{load_config, watcher::ConfigWatcher, InterceptorConfig};
use keda_interceptor::health::{HealthCheck, Probe, RoutingTableSynced};
use keda_interceptor::lifecycle::signals::wait_for_signal;
use keda_interceptor::observability::{init_logging, init_metrics, Collector, Collectors, PrometheusCollector};
use keda_interceptor::placeholder::MemoryConfigSource;
use keda_interceptor::queue::MemoryQueue;
use keda_interceptor::readiness::ReadinessTracker;
use keda_interceptor::routing::{RoutingTable, StaticRoutingTable};
use keda_interceptor::{Dependencies, InterceptorServer, Shutdown};

#[derive(Parser)]
#[command(name = "interceptor", version, about = "Scale-to-zero HTTP interceptor")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => InterceptorConfig::default(),
    };

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "interceptor starting");
    tracing::info!(
        proxy_address = %config.listener.proxy_address,
        admin_address = %config.listener.admin_address,
        routes = config.routes.len(),
        "Configuration loaded"
    );

    let collectors = if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
        Collectors::new(vec![Arc::new(PrometheusCollector) as Arc<dyn Collector>])
    } else {
        Collectors::default()
    };

    let shutdown = Shutdown::new();

    let queue = Arc::new(MemoryQueue::new());
    for target in &config.routes {
        queue.ensure_key(&target.routing_key());
    }
    let table = Arc::new(StaticRoutingTable::from_targets(config.routes.clone()));
    let readiness = Arc::new(ReadinessTracker::new());
    let config_source = Arc::new(MemoryConfigSource::new());

    let checks: Vec<Arc<dyn HealthCheck>> = vec![Arc::new(RoutingTableSynced::new(table.clone()))];
    let probe = Arc::new(Probe::new(checks));
    tokio::spawn(
        probe
            .clone()
            .run(Duration::from_millis(config.probe.interval_ms), shutdown.subscribe()),
    );

    // Keep the watcher handle alive for the life of the process.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            let table = table.clone();
            let queue = queue.clone();
            tokio::spawn(async move {
                while let Some(updated) = updates.recv().await {
                    let removed = queue.sync_keys(updated.routes.iter().map(|t| t.routing_key()));
                    tracing::info!(routes = updated.routes.len(), removed = ?removed, "Routing targets reloaded");
                    table.replace(updated.routes);
                }
            });
            Some(handle)
        }
        None => None,
    };

    tokio::spawn(wait_for_signal(shutdown.clone()));

    let admin_listener = TcpListener::bind(&config.listener.admin_address).await?;
    let admin = setup_admin_router(AdminState {
        queue: queue.clone(),
        table: table.clone(),
        probe: probe.clone(),
    });
    let admin_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        tracing::info!(address = ?admin_listener.local_addr(), "Admin server starting");
        if let Err(e) = axum::serve(admin_listener, admin)
            .with_graceful_shutdown(Shutdown::triggered(admin_shutdown))
            .await
        {
            tracing::error!(error = %e, "Admin server failed");
        }
    });

    let listener = TcpListener::bind(&config.listener.proxy_address).await?;
    let table: Arc<dyn RoutingTable> = table;
    let server = InterceptorServer::new(
        &config,
        Dependencies {
            table,
            queue,
            readiness,
            config_source,
            collectors,
            probe,
            shutdown,
        },
    )?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
