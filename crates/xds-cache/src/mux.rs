//! Routes requests to backing stores by resource kind.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;
use xds_core::{NodeHash, ResourceKind};

use crate::cache::{Cache, Request, Response};
use crate::watch::{Watch, WatchId};

/// A [`Cache`] that classifies each request by kind and forwards it to the
/// store registered for that kind.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use xds_cache::{LinearCache, MuxCache, SnapshotCache};
/// use xds_core::ResourceKind;
///
/// let snapshots = Arc::new(SnapshotCache::new());
/// let endpoints = Arc::new(LinearCache::new(ResourceKind::Endpoint));
///
/// let mux = MuxCache::builder()
///     .route_all(
///         [ResourceKind::Cluster, ResourceKind::Listener],
///         snapshots,
///     )
///     .route(ResourceKind::Endpoint, endpoints)
///     .build();
/// assert!(mux.routes(ResourceKind::Endpoint));
/// assert!(!mux.routes(ResourceKind::Secret));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MuxCache {
    routes: HashMap<ResourceKind, Arc<dyn Cache>>,
}

impl MuxCache {
    /// Create a builder.
    pub fn builder() -> MuxCacheBuilder {
        MuxCacheBuilder::default()
    }

    /// Whether a store is registered for `kind`.
    pub fn routes(&self, kind: ResourceKind) -> bool {
        self.routes.contains_key(&kind)
    }

    fn route(&self, kind: ResourceKind) -> Option<&Arc<dyn Cache>> {
        let cache = self.routes.get(&kind);
        if cache.is_none() {
            warn!(kind = %kind, "no store registered for kind");
        }
        cache
    }
}

impl Cache for MuxCache {
    fn fetch(&self, request: &Request) -> Option<Response> {
        self.route(request.kind)?.fetch(request)
    }

    fn create_watch(&self, node: NodeHash, kind: ResourceKind) -> Watch {
        match self.route(kind) {
            Some(cache) => cache.create_watch(node, kind),
            None => Watch::closed(node, kind),
        }
    }

    fn cancel_watch(&self, watch_id: WatchId) -> bool {
        // Watch ids are process-unique, so at most one store knows it.
        self.routes.values().any(|cache| cache.cancel_watch(watch_id))
    }
}

/// Builder for [`MuxCache`].
#[derive(Debug, Default)]
pub struct MuxCacheBuilder {
    routes: HashMap<ResourceKind, Arc<dyn Cache>>,
}

impl MuxCacheBuilder {
    /// Route `kind` to `cache`.
    pub fn route(mut self, kind: ResourceKind, cache: Arc<dyn Cache>) -> Self {
        self.routes.insert(kind, cache);
        self
    }

    /// Route every kind in `kinds` to `cache`.
    pub fn route_all(
        mut self,
        kinds: impl IntoIterator<Item = ResourceKind>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        for kind in kinds {
            self.routes.insert(kind, Arc::clone(&cache));
        }
        self
    }

    /// Build the multiplexer.
    pub fn build(self) -> MuxCache {
        MuxCache {
            routes: self.routes,
        }
    }
}
