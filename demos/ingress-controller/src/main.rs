//! Ingress Controller Demo
//!
//! Drives a snapshot coordinator with simulated cluster events:
//! - Service events rebuild the routing graph
//! - Endpoints events feed the incremental endpoint path
//! - A watcher logs every version the serving store publishes
//!
//! Real cluster integration would replace the simulator with watches.
//!
//! Run with:
//! ```bash
//! RUST_LOG=info,xds_controller=debug cargo run -p ingress-controller -- [config.json]
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use nebucloud_ingress::prelude::*;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Cluster event.
#[derive(Debug, Clone)]
enum ClusterEvent {
    /// Service added or updated.
    ServiceUpsert { service: ServiceName, port: u32 },
    /// Service deleted.
    ServiceDelete { service: ServiceName },
    /// Endpoints added or updated.
    EndpointsUpsert {
        service: ServiceName,
        addresses: Vec<String>,
        port: u32,
    },
    /// Endpoints deleted.
    EndpointsDelete { service: ServiceName },
}

/// Controller state.
struct Controller {
    coordinator: Arc<SnapshotCoordinator>,
    /// Known services and their serving ports.
    services: BTreeMap<ServiceName, u32>,
    /// Last record seen per service, for update and delete events.
    records: BTreeMap<ServiceName, Endpoints>,
}

impl Controller {
    fn new(coordinator: Arc<SnapshotCoordinator>) -> Self {
        Self {
            coordinator,
            services: BTreeMap::new(),
            records: BTreeMap::new(),
        }
    }

    fn handle_event(&mut self, event: ClusterEvent) {
        match event {
            ClusterEvent::ServiceUpsert { service, port } => {
                info!(service = %service, port, "service upserted");
                self.services.insert(service, port);
                self.rebuild();
            }
            ClusterEvent::ServiceDelete { service } => {
                info!(service = %service, "service deleted");
                self.services.remove(&service);
                self.rebuild();
            }
            ClusterEvent::EndpointsUpsert {
                service,
                addresses,
                port,
            } => {
                debug!(service = %service, count = addresses.len(), "endpoints updated");
                let record = Endpoints::new(service.clone())
                    .with_subset(addresses, vec![EndpointPort::tcp("", port)]);
                let translator = self.coordinator.endpoints();
                match self.records.insert(service, record.clone()) {
                    Some(old) => translator.on_update(old.into(), record.into()),
                    None => translator.on_add(record.into()),
                }
            }
            ClusterEvent::EndpointsDelete { service } => {
                debug!(service = %service, "endpoints deleted");
                match self.records.remove(&service) {
                    Some(old) => self
                        .coordinator
                        .endpoints()
                        .on_delete(WatchedObject::Tombstone(Box::new(old.into()))),
                    None => warn!(service = %service, "delete for unknown endpoints"),
                }
            }
        }
    }

    /// One virtual host per service, routed by namespace and name.
    fn rebuild(&self) {
        let hosts = self
            .services
            .iter()
            .map(|(service, port)| {
                VirtualHost::new(
                    format!("{}.{}.example.com", service.name, service.namespace),
                    vec![Route::prefix(
                        "/",
                        vec![Cluster::new(Service::new(
                            service.namespace.as_str(),
                            service.name.as_str(),
                            *port,
                        ))],
                    )],
                )
            })
            .collect();
        let dag = Dag::builder().listener(Listener::http(hosts)).build();
        self.coordinator.on_change(&dag);
        info!(services = self.services.len(), "graph rebuilt");
    }
}

/// Log every version published for `kind`.
async fn log_versions(coordinator: Arc<SnapshotCoordinator>, kind: ResourceKind) {
    let cache = coordinator.cache();
    let mut watch = cache.create_watch(coordinator.node(), kind);
    while let Some(update) = watch.recv().await {
        let count = cache
            .fetch(&Request::new(coordinator.node(), kind))
            .map_or(0, |r| r.resources.len());
        info!(kind = %update.kind, version = %update.version, resources = count, "published");
    }
}

/// Simulate cluster watch events.
async fn simulate_events(tx: mpsc::Sender<ClusterEvent>) {
    let services = [
        (ServiceName::new("default", "frontend"), 80, 8080),
        (ServiceName::new("default", "backend-api"), 8080, 8080),
        (ServiceName::new("infrastructure", "cache"), 6379, 6379),
    ];

    for (service, port, _) in &services {
        let event = ClusterEvent::ServiceUpsert {
            service: service.clone(),
            port: *port,
        };
        if tx.send(event).await.is_err() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(2));
    for tick in 0usize.. {
        interval.tick().await;

        let (service, _, target_port) = &services[tick % services.len()];
        let event = if tick % 7 == 6 {
            ClusterEvent::EndpointsDelete {
                service: service.clone(),
            }
        } else {
            let replicas = 1 + tick % 3;
            ClusterEvent::EndpointsUpsert {
                service: service.clone(),
                addresses: (0..replicas)
                    .map(|r| format!("10.{}.0.{}", tick % services.len(), r + 1))
                    .collect(),
                port: *target_port,
            }
        };
        if tx.send(event).await.is_err() {
            return;
        }
    }
}

fn load_config() -> Result<ControllerConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)?;
            info!(path = %path, "loading configuration");
            Ok(ControllerConfig::from_json(&json)?)
        }
        None => Ok(ControllerConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("{}", nebucloud_ingress::version::version_string());

    let config = load_config()?;
    let coordinator = SnapshotCoordinator::new(config)?;
    info!(node = %coordinator.node(), mode = ?coordinator.mode(), "coordinator created");

    tokio::spawn(log_versions(Arc::clone(&coordinator), ResourceKind::Cluster));
    tokio::spawn(log_versions(Arc::clone(&coordinator), ResourceKind::Endpoint));

    let mut controller = Controller::new(Arc::clone(&coordinator));
    controller.rebuild();

    let (tx, mut rx) = mpsc::channel::<ClusterEvent>(100);
    tokio::spawn(simulate_events(tx));

    info!("controller started, press Ctrl+C to shut down");

    loop {
        tokio::select! {
            Some(event) = rx.recv() => controller.handle_event(event),
            _ = signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}
