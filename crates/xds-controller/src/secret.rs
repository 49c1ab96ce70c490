//! Secret cache.

use std::sync::Arc;

use xds_core::{BoxResource, ResourceKind};
use xds_dag::Dag;
use xds_types::envoy::extensions::transport_sockets::tls::v3::Secret;

use crate::cache::{ResourceStore, TypedResourceCache};
use crate::translate;

/// Holds the TLS certificates referenced by secure virtual hosts.
#[derive(Debug, Default)]
pub struct SecretCache {
    store: ResourceStore<Secret>,
}

impl SecretCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a secret by name.
    pub fn get(&self, name: &str) -> Option<Arc<Secret>> {
        self.store.get(name)
    }
}

impl TypedResourceCache for SecretCache {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Secret
    }

    fn on_change(&self, dag: &Dag) {
        self.store
            .replace(dag.secrets().into_iter().map(translate::secret));
    }

    fn contents(&self) -> Vec<BoxResource> {
        self.store.contents()
    }

    fn query(&self, names: &[String]) -> Vec<BoxResource> {
        self.store.query(names)
    }
}
