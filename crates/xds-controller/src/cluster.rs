//! Cluster cache.

use std::sync::Arc;

use tracing::debug;
use xds_core::{BoxResource, ResourceKind};
use xds_dag::Dag;
use xds_types::envoy::config::cluster::v3::Cluster;

use crate::cache::{ResourceStore, TypedResourceCache};
use crate::translate;

/// Holds one EDS cluster per graph cluster and per extension cluster.
#[derive(Debug, Default)]
pub struct ClusterCache {
    store: ResourceStore<Cluster>,
}

impl ClusterCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cluster by name.
    pub fn get(&self, name: &str) -> Option<Arc<Cluster>> {
        self.store.get(name)
    }
}

impl TypedResourceCache for ClusterCache {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Cluster
    }

    fn on_change(&self, dag: &Dag) {
        let clusters: Vec<Cluster> = dag
            .clusters()
            .into_iter()
            .map(translate::cluster)
            .chain(dag.extension_clusters().iter().map(translate::extension_cluster))
            .collect();
        debug!(count = clusters.len(), "rebuilt clusters");
        self.store.replace(clusters);
    }

    fn contents(&self) -> Vec<BoxResource> {
        self.store.contents()
    }

    fn query(&self, names: &[String]) -> Vec<BoxResource> {
        self.store.query(names)
    }
}
