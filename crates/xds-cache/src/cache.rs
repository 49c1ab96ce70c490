//! The [`Cache`] capability and the versioned [`SnapshotCache`].
//!
//! The serving layer talks to every store through [`Cache`]: it fetches the
//! current resources of one kind, and watches for the next version. The
//! [`SnapshotCache`] stores immutable snapshots keyed by node hash in a
//! `DashMap`, so concurrent readers never block each other.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace, warn};
use xds_core::{BoxResource, NodeHash, ResourceKind, ResourceVersion, XdsResult};

use crate::snapshot::Snapshot;
use crate::stats::CacheStats;
use crate::watch::{Update, Watch, WatchId, WatchManager};

/// A request for the resources of one kind.
#[derive(Debug, Clone)]
pub struct Request {
    /// Node the request is made for.
    pub node: NodeHash,
    /// Kind of resource requested.
    pub kind: ResourceKind,
    /// Version the client already holds; empty on first request.
    pub version: ResourceVersion,
    /// Requested names; empty means all.
    pub names: Vec<String>,
}

impl Request {
    /// Request every resource of `kind`.
    pub fn new(node: NodeHash, kind: ResourceKind) -> Self {
        Self {
            node,
            kind,
            version: ResourceVersion::empty(),
            names: Vec::new(),
        }
    }

    /// Set the version the client already holds.
    pub fn with_version(mut self, version: impl Into<ResourceVersion>) -> Self {
        self.version = version.into();
        self
    }

    /// Restrict the request to the given names.
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Resources returned for a [`Request`].
#[derive(Debug, Clone)]
pub struct Response {
    /// Kind of the returned resources.
    pub kind: ResourceKind,
    /// Version of the returned resource set.
    pub version: ResourceVersion,
    /// The resources, ordered by name.
    pub resources: Vec<BoxResource>,
}

impl Response {
    /// Names of the returned resources.
    pub fn names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.name()).collect()
    }
}

/// A store the serving layer reads from.
pub trait Cache: Send + Sync + fmt::Debug {
    /// Current resources for a request.
    ///
    /// Returns `None` when the store holds nothing for the request, or when
    /// the client is already at the current version.
    fn fetch(&self, request: &Request) -> Option<Response>;

    /// Subscribe to version changes of `kind` for `node`.
    fn create_watch(&self, node: NodeHash, kind: ResourceKind) -> Watch;

    /// Cancel a watch. Returns whether this store knew the watch.
    fn cancel_watch(&self, watch_id: WatchId) -> bool;
}

/// A store of immutable, versioned snapshots keyed by node.
///
/// Setting a snapshot replaces the previous one for that node atomically;
/// readers see either the old bundle or the new one, never a mix. Watches
/// are notified for each kind whose version changed.
#[derive(Debug)]
pub struct SnapshotCache {
    /// Snapshots keyed by node hash.
    snapshots: DashMap<NodeHash, Arc<Snapshot>>,
    watches: WatchManager,
    stats: CacheStats,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotCache {
    /// Create an empty snapshot cache.
    pub fn new() -> Self {
        Self::with_watch_buffer(16)
    }

    /// Create an empty snapshot cache whose watch channels hold
    /// `buffer_size` pending updates.
    pub fn with_watch_buffer(buffer_size: usize) -> Self {
        Self {
            snapshots: DashMap::new(),
            watches: WatchManager::with_buffer_size(buffer_size),
            stats: CacheStats::new(),
        }
    }

    /// Get cache statistics.
    #[inline]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Get the watch manager.
    #[inline]
    pub fn watches(&self) -> &WatchManager {
        &self.watches
    }

    /// Publish a snapshot for a node.
    ///
    /// The snapshot is checked for consistency first. A rejected snapshot
    /// leaves whatever was published before in place.
    pub fn set_snapshot(&self, node: NodeHash, snapshot: Snapshot) -> XdsResult<()> {
        if let Err(e) = snapshot.validate() {
            self.stats.record_rejected();
            warn!(node = %node, version = %snapshot.version(), error = %e, "snapshot rejected");
            return Err(e);
        }

        let snapshot = Arc::new(snapshot);
        let previous = self.snapshots.insert(node, Arc::clone(&snapshot));
        self.stats.record_accepted();

        debug!(
            node = %node,
            version = %snapshot.version(),
            resources = snapshot.total_resources(),
            "set snapshot"
        );

        let mut notified = 0;
        for kind in snapshot.kinds() {
            let Some(version) = snapshot.get_version(kind) else {
                continue;
            };
            let unchanged = previous
                .as_ref()
                .and_then(|p| p.get_version(kind))
                .is_some_and(|v| v == version);
            if unchanged {
                continue;
            }
            notified += self.watches.notify(
                node,
                &Update {
                    kind,
                    version: version.clone(),
                },
            );
        }
        self.stats.record_notifications(notified);

        Ok(())
    }

    /// The snapshot published for a node.
    pub fn get_snapshot(&self, node: NodeHash) -> Option<Arc<Snapshot>> {
        // Clone the Arc so the shard lock is released right away.
        self.snapshots.get(&node).map(|r| Arc::clone(&*r))
    }

    /// Remove the snapshot for a node.
    pub fn clear_snapshot(&self, node: NodeHash) {
        if self.snapshots.remove(&node).is_some() {
            debug!(node = %node, "cleared snapshot");
        }
    }

    /// Whether a snapshot is published for a node.
    pub fn has_snapshot(&self, node: NodeHash) -> bool {
        self.snapshots.contains_key(&node)
    }

    /// Number of published snapshots.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }
}

impl Cache for SnapshotCache {
    fn fetch(&self, request: &Request) -> Option<Response> {
        let response = self.get_snapshot(request.node).and_then(|snapshot| {
            let set = snapshot.get_resources(request.kind)?;
            if *set.version() == request.version {
                return None;
            }
            Some(Response {
                kind: request.kind,
                version: set.version().clone(),
                resources: set.select(&request.names),
            })
        });

        if response.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
            trace!(node = %request.node, kind = %request.kind, "nothing to fetch");
        }
        response
    }

    fn create_watch(&self, node: NodeHash, kind: ResourceKind) -> Watch {
        self.watches.create_watch(node, kind)
    }

    fn cancel_watch(&self, watch_id: WatchId) -> bool {
        self.watches.cancel_watch(watch_id)
    }
}
