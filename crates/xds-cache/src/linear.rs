//! Incremental store for a single resource kind.
//!
//! A [`LinearCache`] is not partitioned by node: every consumer sees the
//! same resources. Each resource carries the version at which it last
//! changed, and the store as a whole carries the version of its most recent
//! change. Updates that do not change a resource's encoding are dropped
//! without bumping any version or waking any watch.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};
use xds_core::{
    encoded_eq, BoxResource, NodeHash, ResourceKind, ResourceVersion, XdsError, XdsResult,
};

use crate::cache::{Cache, Request, Response};
use crate::stats::CacheStats;
use crate::watch::{Update, Watch, WatchId, WatchManager};

#[derive(Debug)]
struct Versioned {
    resource: BoxResource,
    version: ResourceVersion,
}

#[derive(Debug, Default)]
struct LinearState {
    resources: BTreeMap<String, Versioned>,
    counter: u64,
}

/// Incremental, per-resource-versioned store for one resource kind.
#[derive(Debug)]
pub struct LinearCache {
    kind: ResourceKind,
    prefix: ResourceVersion,
    state: RwLock<LinearState>,
    watches: WatchManager,
    stats: CacheStats,
}

impl LinearCache {
    /// Create an empty store for `kind`.
    pub fn new(kind: ResourceKind) -> Self {
        Self::with_watch_buffer(kind, 16)
    }

    /// Create an empty store whose watch channels hold `buffer_size` pending
    /// updates.
    pub fn with_watch_buffer(kind: ResourceKind, buffer_size: usize) -> Self {
        Self {
            kind,
            prefix: ResourceVersion::generate(),
            state: RwLock::new(LinearState::default()),
            watches: WatchManager::with_buffer_size(buffer_size),
            stats: CacheStats::new(),
        }
    }

    /// The kind this store holds.
    #[inline]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Get cache statistics.
    #[inline]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn version_at(&self, counter: u64) -> ResourceVersion {
        ResourceVersion::new(format!("{}-{counter}", self.prefix))
    }

    /// Version of the most recent change.
    pub fn version(&self) -> ResourceVersion {
        self.version_at(self.state.read().counter)
    }

    /// Version at which `name` last changed.
    pub fn resource_version(&self, name: &str) -> Option<ResourceVersion> {
        self.state
            .read()
            .resources
            .get(name)
            .map(|v| v.version.clone())
    }

    /// Look up a resource by name.
    pub fn get_resource(&self, name: &str) -> Option<BoxResource> {
        self.state
            .read()
            .resources
            .get(name)
            .map(|v| v.resource.clone())
    }

    /// Number of stored resources.
    pub fn len(&self) -> usize {
        self.state.read().resources.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.state.read().resources.is_empty()
    }

    fn check_kind(&self, resource: &BoxResource) -> XdsResult<()> {
        if resource.kind() != self.kind {
            self.stats.record_rejected();
            return Err(XdsError::InvalidTypeUrl {
                type_url: resource.type_url().to_string(),
            });
        }
        Ok(())
    }

    /// Insert or replace one resource. Returns whether anything changed.
    pub fn update_resource(&self, resource: BoxResource) -> XdsResult<bool> {
        self.check_kind(&resource)?;
        Ok(self.apply(vec![resource], Vec::new()) > 0)
    }

    /// Remove one resource. Returns whether it was present.
    pub fn delete_resource(&self, name: &str) -> bool {
        self.apply(Vec::new(), vec![name.to_string()]) > 0
    }

    /// Replace the whole resource set.
    ///
    /// Resources absent from `resources` are removed; present ones are
    /// updated only when their encoding differs. A resource handed back as
    /// the same `Arc` that is already stored is unchanged and is not
    /// re-encoded. Returns the number of
    /// resources added, changed, or removed.
    pub fn set_resources(
        &self,
        resources: impl IntoIterator<Item = BoxResource>,
    ) -> XdsResult<usize> {
        let resources: Vec<BoxResource> = resources.into_iter().collect();
        for resource in &resources {
            self.check_kind(resource)?;
        }

        let removed: Vec<String> = {
            let incoming: HashSet<&str> = resources.iter().map(|r| r.name()).collect();
            let state = self.state.read();
            state
                .resources
                .keys()
                .filter(|name| !incoming.contains(name.as_str()))
                .cloned()
                .collect()
        };

        Ok(self.apply(resources, removed))
    }

    /// Apply upserts and removals under one write lock, then notify once.
    /// Returns the number of resources that changed.
    fn apply(&self, upserts: Vec<BoxResource>, removals: Vec<String>) -> usize {
        let mut changed = 0;
        let version = {
            let mut state = self.state.write();
            let next = self.version_at(state.counter + 1);

            for resource in upserts {
                let unchanged = state
                    .resources
                    .get(resource.name())
                    .is_some_and(|v| {
                        Arc::ptr_eq(&v.resource, &resource)
                            || encoded_eq(v.resource.as_ref(), resource.as_ref())
                    });
                if unchanged {
                    continue;
                }
                state.resources.insert(
                    resource.name().to_string(),
                    Versioned {
                        resource,
                        version: next.clone(),
                    },
                );
                changed += 1;
            }
            for name in removals {
                if state.resources.remove(&name).is_some() {
                    changed += 1;
                }
            }

            if changed == 0 {
                trace!(kind = %self.kind, "no resource changed");
                return 0;
            }
            state.counter += 1;
            next
        };

        self.stats.record_accepted();
        debug!(kind = %self.kind, version = %version, changed, "updated resources");

        let notified = self.watches.notify(
            NodeHash::wildcard(),
            &Update {
                kind: self.kind,
                version,
            },
        );
        self.stats.record_notifications(notified);
        changed
    }
}

impl Cache for LinearCache {
    fn fetch(&self, request: &Request) -> Option<Response> {
        if request.kind != self.kind {
            self.stats.record_miss();
            return None;
        }

        let state = self.state.read();
        let version = self.version_at(state.counter);
        if version == request.version {
            self.stats.record_miss();
            return None;
        }

        let resources: Vec<BoxResource> = if request.names.is_empty() {
            state.resources.values().map(|v| v.resource.clone()).collect()
        } else {
            state
                .resources
                .iter()
                .filter(|(name, _)| request.names.iter().any(|n| n == *name))
                .map(|(_, v)| v.resource.clone())
                .collect()
        };
        drop(state);

        self.stats.record_hit();
        Some(Response {
            kind: self.kind,
            version,
            resources,
        })
    }

    fn create_watch(&self, node: NodeHash, kind: ResourceKind) -> Watch {
        self.watches.create_watch(node, kind)
    }

    fn cancel_watch(&self, watch_id: WatchId) -> bool {
        self.watches.cancel_watch(watch_id)
    }
}
