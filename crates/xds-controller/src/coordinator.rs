//! Snapshot coordinator.
//!
//! Collects the contents of every typed cache and publishes them to the
//! serving store under one node key. Two store layouts are supported:
//!
//! - [`CacheMode::Shared`]: one [`SnapshotCache`] holding all six kinds.
//!   Every publish, graph or endpoint, bumps one version and republishes the
//!   full bundle.
//! - [`CacheMode::Split`]: a [`SnapshotCache`] for the five low-churn kinds
//!   and a [`LinearCache`] for load assignments, joined by a [`MuxCache`].
//!   Endpoint refreshes touch only the linear store.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error, info};
use xds_cache::{Cache, LinearCache, MuxCache, Snapshot, SnapshotCache};
use xds_core::{NodeHash, ResourceKind, ResourceVersion, XdsError, XdsResult};
use xds_dag::Dag;

use crate::cache::TypedResourceCache;
use crate::config::{CacheMode, ControllerConfig};
use crate::endpoint::{EndpointTranslator, Observer};
use crate::metrics::ControllerMetrics;
use crate::{ClusterCache, ListenerCache, RouteCache, RuntimeCache, SecretCache};

enum Store {
    Shared(Arc<SnapshotCache>),
    Split {
        snapshots: Arc<SnapshotCache>,
        endpoints: Arc<LinearCache>,
        mux: Arc<MuxCache>,
    },
}

impl Store {
    fn new(mode: CacheMode, buffer: usize) -> Self {
        let snapshots = Arc::new(SnapshotCache::with_watch_buffer(buffer));
        match mode {
            CacheMode::Shared => Store::Shared(snapshots),
            CacheMode::Split => {
                let endpoints = Arc::new(LinearCache::with_watch_buffer(
                    ResourceKind::Endpoint,
                    buffer,
                ));
                let low_churn = ResourceKind::ALL
                    .iter()
                    .copied()
                    .filter(|k| *k != ResourceKind::Endpoint);
                let mux = MuxCache::builder()
                    .route_all(low_churn, Arc::clone(&snapshots) as Arc<dyn Cache>)
                    .route(ResourceKind::Endpoint, Arc::clone(&endpoints) as Arc<dyn Cache>)
                    .build();
                Store::Split {
                    snapshots,
                    endpoints,
                    mux: Arc::new(mux),
                }
            }
        }
    }

    fn mode(&self) -> CacheMode {
        match self {
            Store::Shared(_) => CacheMode::Shared,
            Store::Split { .. } => CacheMode::Split,
        }
    }

    fn snapshots(&self) -> &Arc<SnapshotCache> {
        match self {
            Store::Shared(snapshots) | Store::Split { snapshots, .. } => snapshots,
        }
    }
}

/// Publishes typed cache contents as snapshots.
///
/// Build it with [`SnapshotCoordinator::new`] for the standard set of caches
/// or [`SnapshotCoordinator::with_caches`] to supply your own. Either way it
/// comes back in an `Arc` and is already registered as the endpoint
/// translator's observer.
pub struct SnapshotCoordinator {
    node: NodeHash,
    caches: Vec<Arc<dyn TypedResourceCache>>,
    endpoints: Arc<EndpointTranslator>,
    store: Store,
    publish_lock: Mutex<()>,
    metrics: ControllerMetrics,
}

impl fmt::Debug for SnapshotCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<ResourceKind> = self.caches.iter().map(|c| c.kind()).collect();
        f.debug_struct("SnapshotCoordinator")
            .field("node", &self.node)
            .field("mode", &self.store.mode())
            .field("caches", &kinds)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl SnapshotCoordinator {
    /// Create a coordinator over the cluster, listener, route, secret and
    /// runtime caches plus a fresh endpoint translator.
    pub fn new(config: ControllerConfig) -> XdsResult<Arc<Self>> {
        let caches: Vec<Arc<dyn TypedResourceCache>> = vec![
            Arc::new(ClusterCache::new()),
            Arc::new(ListenerCache::new(&config)),
            Arc::new(RouteCache::new()),
            Arc::new(SecretCache::new()),
            Arc::new(RuntimeCache::new(&config.runtime)),
        ];
        Self::with_caches(config, caches, Arc::new(EndpointTranslator::new()))
    }

    /// Create a coordinator over an explicit set of caches.
    ///
    /// `caches` must hold at most one cache per kind and none for
    /// [`ResourceKind::Endpoint`], which `endpoints` serves.
    pub fn with_caches(
        config: ControllerConfig,
        caches: Vec<Arc<dyn TypedResourceCache>>,
        endpoints: Arc<EndpointTranslator>,
    ) -> XdsResult<Arc<Self>> {
        config.validate()?;

        let mut seen = HashSet::new();
        for cache in &caches {
            let kind = cache.kind();
            if kind == ResourceKind::Endpoint || !seen.insert(kind) {
                return Err(XdsError::Configuration(format!(
                    "{kind} cannot take another cache"
                )));
            }
        }

        let coordinator = Arc::new(Self {
            node: NodeHash::from_id(&config.node_id),
            caches,
            endpoints,
            store: Store::new(config.cache_mode, config.watch_buffer_size),
            publish_lock: Mutex::new(()),
            metrics: ControllerMetrics,
        });

        let weak = Arc::downgrade(&coordinator);
        let observer: Weak<dyn Observer> = weak;
        coordinator.endpoints.set_observer(observer);

        info!(
            node = %coordinator.node,
            mode = ?coordinator.store.mode(),
            caches = coordinator.caches.len(),
            "snapshot coordinator ready"
        );
        Ok(coordinator)
    }

    /// The node key snapshots are published under.
    pub fn node(&self) -> NodeHash {
        self.node
    }

    /// The store layout in use.
    pub fn mode(&self) -> CacheMode {
        self.store.mode()
    }

    /// The store the serving layer reads from.
    pub fn cache(&self) -> Arc<dyn Cache> {
        match &self.store {
            Store::Shared(snapshots) => Arc::clone(snapshots) as Arc<dyn Cache>,
            Store::Split { mux, .. } => Arc::clone(mux) as Arc<dyn Cache>,
        }
    }

    /// The snapshot store. In split mode it holds every kind but endpoints.
    pub fn snapshots(&self) -> &Arc<SnapshotCache> {
        self.store.snapshots()
    }

    /// The incremental endpoint store, in split mode only.
    pub fn linear(&self) -> Option<&Arc<LinearCache>> {
        match &self.store {
            Store::Shared(_) => None,
            Store::Split { endpoints, .. } => Some(endpoints),
        }
    }

    /// The endpoint translator. Feed address records into it.
    pub fn endpoints(&self) -> &Arc<EndpointTranslator> {
        &self.endpoints
    }

    /// The graph was rebuilt: refresh every cache, then publish.
    pub fn on_change(&self, dag: &Dag) {
        for cache in &self.caches {
            cache.on_change(dag);
        }
        self.endpoints.on_change(dag);
        self.publish_all();
    }

    /// Publish everything. Errors are logged and the previous state stays.
    fn publish_all(&self) {
        let _guard = self.publish_lock.lock();
        let result = match &self.store {
            Store::Shared(snapshots) => self.publish_snapshot(snapshots, true),
            Store::Split {
                snapshots,
                endpoints,
                ..
            } => self
                .publish_snapshot(snapshots, false)
                .and_then(|()| self.publish_linear(endpoints)),
        };
        self.record(result);
    }

    /// Publish load assignments only.
    fn publish_endpoints(&self) {
        let _guard = self.publish_lock.lock();
        let result = match &self.store {
            Store::Shared(snapshots) => self.publish_snapshot(snapshots, true),
            Store::Split { endpoints, .. } => self.publish_linear(endpoints),
        };
        self.record(result);
    }

    fn publish_snapshot(&self, store: &SnapshotCache, with_endpoints: bool) -> XdsResult<()> {
        let version = ResourceVersion::generate();
        let mut builder = Snapshot::builder().version(version.clone());
        for cache in &self.caches {
            builder = builder.resources(cache.kind(), cache.contents());
        }
        if with_endpoints {
            builder = builder.resources(ResourceKind::Endpoint, self.endpoints.contents());
        }

        let snapshot = builder.build();
        let resources = snapshot.total_resources();
        store.set_snapshot(self.node, snapshot)?;

        self.metrics.snapshot_published("all");
        debug!(node = %self.node, version = %version, resources, "published snapshot");
        Ok(())
    }

    fn publish_linear(&self, store: &LinearCache) -> XdsResult<()> {
        let changed = store.set_resources(self.endpoints.contents())?;
        if changed > 0 {
            self.metrics.snapshot_published("endpoints");
            debug!(version = %store.version(), changed, "published load assignments");
        }
        Ok(())
    }

    fn record(&self, result: XdsResult<()>) {
        if let Err(e) = result {
            self.metrics.publish_error();
            error!(node = %self.node, error = %e, "publish failed, previous state kept");
        }
    }
}

impl Observer for SnapshotCoordinator {
    fn refresh(&self) {
        self.publish_endpoints();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use xds_cache::Request;
    use xds_core::BoxResource;
    use xds_dag::{
        Cluster, EndpointPort, Endpoints, ExtensionCluster, Listener, Route, Service, ServiceCluster,
        ServiceName, VirtualHost, WeightedService,
    };
    use xds_types::envoy::config::cluster::v3::Cluster as EnvoyCluster;

    fn dag() -> Dag {
        Dag::builder()
            .listener(Listener::http(vec![VirtualHost::new(
                "*",
                vec![Route::prefix(
                    "/",
                    vec![Cluster::new(Service::new("default", "simple", 80))],
                )],
            )]))
            .build()
    }

    fn simple(addresses: &[&str]) -> Endpoints {
        Endpoints::new(ServiceName::new("default", "simple"))
            .with_subset(addresses.iter().copied(), vec![EndpointPort::tcp("", 8080)])
    }

    fn coordinator(mode: CacheMode) -> Arc<SnapshotCoordinator> {
        SnapshotCoordinator::new(ControllerConfig {
            cache_mode: mode,
            ..ControllerConfig::default()
        })
        .unwrap()
    }

    fn names(coordinator: &SnapshotCoordinator, kind: ResourceKind) -> Vec<String> {
        coordinator
            .cache()
            .fetch(&Request::new(coordinator.node(), kind))
            .map(|r| r.names().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    #[test]
    fn publishes_every_kind() {
        for mode in [CacheMode::Shared, CacheMode::Split] {
            let coordinator = coordinator(mode);
            coordinator.on_change(&dag());

            assert_eq!(names(&coordinator, ResourceKind::Cluster), ["default/simple/80"]);
            assert_eq!(
                names(&coordinator, ResourceKind::Listener),
                ["ingress_http", "stats-health"]
            );
            assert_eq!(names(&coordinator, ResourceKind::Route), ["ingress_http"]);
            assert_eq!(names(&coordinator, ResourceKind::Runtime), ["dynamic"]);
            assert_eq!(names(&coordinator, ResourceKind::Endpoint), ["default/simple"]);
        }
    }

    #[test]
    fn unnamed_extension_cluster_does_not_block_publish() {
        let dag = Dag::builder()
            .listener(Listener::http(vec![VirtualHost::new(
                "*",
                vec![Route::prefix(
                    "/",
                    vec![Cluster::new(Service::new("default", "simple", 80))],
                )],
            )]))
            .extension_cluster(ExtensionCluster {
                name: String::new(),
                upstream: ServiceCluster::new("", Vec::new()),
                ..ExtensionCluster::default()
            })
            .extension_cluster(ExtensionCluster {
                name: "extension/auth/authz".to_string(),
                upstream: ServiceCluster::new(
                    "extension/auth/authz",
                    vec![WeightedService::new(ServiceName::new("auth", "authz"), "")],
                ),
                ..ExtensionCluster::default()
            })
            .build();

        for mode in [CacheMode::Shared, CacheMode::Split] {
            let coordinator = coordinator(mode);
            coordinator.on_change(&dag);

            assert!(coordinator.snapshots().get_snapshot(coordinator.node()).is_some());
            assert_eq!(
                names(&coordinator, ResourceKind::Cluster),
                ["default/simple/80", "extension/auth/authz"]
            );
            assert_eq!(names(&coordinator, ResourceKind::Route), ["ingress_http"]);
            assert_eq!(
                names(&coordinator, ResourceKind::Endpoint),
                ["default/simple", "extension/auth/authz"]
            );
            assert_eq!(coordinator.snapshots().stats().updates_rejected(), 0);
        }
    }

    #[test]
    fn split_mode_keeps_endpoints_out_of_the_snapshot() {
        let coordinator = coordinator(CacheMode::Split);
        coordinator.on_change(&dag());

        let snapshot = coordinator.snapshots().get_snapshot(coordinator.node()).unwrap();
        assert!(!snapshot.contains_kind(ResourceKind::Endpoint));
        assert_eq!(coordinator.linear().unwrap().len(), 1);

        let version = snapshot.version().clone();
        coordinator.endpoints().on_add(simple(&["10.0.0.1"]).into());
        let after = coordinator.snapshots().get_snapshot(coordinator.node()).unwrap();
        assert_eq!(after.version(), &version);
    }

    #[test]
    fn shared_mode_republishes_the_bundle() {
        let coordinator = coordinator(CacheMode::Shared);
        assert!(coordinator.linear().is_none());
        coordinator.on_change(&dag());
        let before = coordinator.snapshots().get_snapshot(coordinator.node()).unwrap();

        coordinator.endpoints().on_add(simple(&["10.0.0.1"]).into());
        let after = coordinator.snapshots().get_snapshot(coordinator.node()).unwrap();
        assert_ne!(after.version(), before.version());
        assert_eq!(after.total_resources(), before.total_resources());
    }

    #[tokio::test]
    async fn split_watches_see_only_endpoint_churn() {
        let coordinator = coordinator(CacheMode::Split);
        coordinator.on_change(&dag());

        let cache = coordinator.cache();
        let mut clusters = cache.create_watch(coordinator.node(), ResourceKind::Cluster);
        let mut endpoints = cache.create_watch(coordinator.node(), ResourceKind::Endpoint);

        coordinator.endpoints().on_add(simple(&["10.0.0.1"]).into());

        let update = endpoints.recv().await.unwrap();
        assert_eq!(update.kind, ResourceKind::Endpoint);
        assert!(clusters.try_recv().is_err());

        // An address change with nothing to show publishes nothing.
        coordinator.endpoints().on_add(simple(&["10.0.0.1"]).into());
        assert!(endpoints.try_recv().is_err());
    }

    #[tokio::test]
    async fn shared_watches_see_every_kind() {
        let coordinator = coordinator(CacheMode::Shared);
        coordinator.on_change(&dag());

        let cache = coordinator.cache();
        let mut clusters = cache.create_watch(coordinator.node(), ResourceKind::Cluster);
        let mut endpoints = cache.create_watch(coordinator.node(), ResourceKind::Endpoint);

        coordinator.endpoints().on_add(simple(&["10.0.0.1"]).into());

        assert_eq!(clusters.recv().await.unwrap().kind, ResourceKind::Cluster);
        assert_eq!(endpoints.recv().await.unwrap().kind, ResourceKind::Endpoint);
    }

    /// Files a cluster under the secret kind once switched on.
    #[derive(Default)]
    struct Misfiled(AtomicBool);

    impl TypedResourceCache for Misfiled {
        fn kind(&self) -> ResourceKind {
            ResourceKind::Secret
        }

        fn on_change(&self, _dag: &Dag) {}

        fn contents(&self) -> Vec<BoxResource> {
            if !self.0.load(Ordering::SeqCst) {
                return Vec::new();
            }
            vec![Arc::new(EnvoyCluster {
                name: "wrong".to_string(),
                ..Default::default()
            })]
        }

        fn query(&self, _names: &[String]) -> Vec<BoxResource> {
            self.contents()
        }
    }

    #[test]
    fn rejected_publish_keeps_previous_snapshot() {
        let misfiled = Arc::new(Misfiled::default());
        let caches: Vec<Arc<dyn TypedResourceCache>> =
            vec![Arc::new(ClusterCache::new()), misfiled.clone()];
        let coordinator = SnapshotCoordinator::with_caches(
            ControllerConfig::default(),
            caches,
            Arc::new(EndpointTranslator::new()),
        )
        .unwrap();

        coordinator.on_change(&dag());
        let before = coordinator.snapshots().get_snapshot(coordinator.node()).unwrap();

        misfiled.0.store(true, Ordering::SeqCst);
        coordinator.on_change(&dag());
        let after = coordinator.snapshots().get_snapshot(coordinator.node()).unwrap();
        assert_eq!(after.version(), before.version());
        assert_eq!(coordinator.snapshots().stats().updates_rejected(), 1);
    }

    #[test]
    fn rejects_duplicate_and_endpoint_caches() {
        let clusters: Vec<Arc<dyn TypedResourceCache>> =
            vec![Arc::new(ClusterCache::new()), Arc::new(ClusterCache::new())];
        let duplicated = SnapshotCoordinator::with_caches(
            ControllerConfig::default(),
            clusters,
            Arc::new(EndpointTranslator::new()),
        );
        assert!(matches!(duplicated, Err(XdsError::Configuration(_))));

        let endpoints: Vec<Arc<dyn TypedResourceCache>> = vec![Arc::new(EndpointTranslator::new())];
        let endpoint = SnapshotCoordinator::with_caches(
            ControllerConfig::default(),
            endpoints,
            Arc::new(EndpointTranslator::new()),
        );
        assert!(matches!(endpoint, Err(XdsError::Configuration(_))));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = SnapshotCoordinator::new(ControllerConfig {
            node_id: String::new(),
            ..ControllerConfig::default()
        });
        assert!(matches!(result, Err(XdsError::Configuration(_))));
    }
}
