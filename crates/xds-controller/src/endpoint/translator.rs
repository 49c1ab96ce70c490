use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, trace, warn};
use xds_core::{BoxResource, ResourceKind, XdsError};
use xds_dag::{AddressRecord, Dag, WatchedObject};
use xds_types::envoy::config::endpoint::v3::ClusterLoadAssignment;

use super::engine::LoadAssignmentCache;
use crate::cache::{sorted_names, TypedResourceCache};
use crate::metrics::ControllerMetrics;
use crate::translate;

/// Receives a push each time the published load assignments change.
pub trait Observer: Send + Sync {
    /// Called at most once per actual change.
    fn refresh(&self);
}

impl<F> Observer for F
where
    F: Fn() + Send + Sync,
{
    fn refresh(&self) {
        self()
    }
}

type Published = BTreeMap<String, Arc<ClusterLoadAssignment>>;

/// The endpoint cache.
///
/// Wraps a [`LoadAssignmentCache`] and publishes its results. Graph changes
/// replace the published map wholesale. Address changes merge recomputed
/// clusters into it and notify the observer only when the merged map
/// differs from what was published before.
///
/// The published map has its own lock, so readers are never blocked behind
/// a recalculation. Writers are serialized so a slower recalculation never
/// overwrites a newer one.
#[derive(Default)]
pub struct EndpointTranslator {
    engine: LoadAssignmentCache,
    writer: Mutex<()>,
    published: RwLock<Published>,
    observer: RwLock<Option<Weak<dyn Observer>>>,
    metrics: ControllerMetrics,
}

impl fmt::Debug for EndpointTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointTranslator")
            .field("engine", &self.engine)
            .field("published", &self.published.read().len())
            .field("observer", &self.observer.read().is_some())
            .finish()
    }
}

impl EndpointTranslator {
    /// Create an empty translator with no observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the observer. Only a weak reference is held.
    pub fn set_observer(&self, observer: Weak<dyn Observer>) {
        *self.observer.write() = Some(observer);
    }

    /// The engine behind this cache.
    pub fn engine(&self) -> &LoadAssignmentCache {
        &self.engine
    }

    /// The published assignment for a cluster.
    pub fn get(&self, name: &str) -> Option<Arc<ClusterLoadAssignment>> {
        self.published.read().get(name).cloned()
    }

    /// An address record appeared.
    pub fn on_add(&self, object: WatchedObject) {
        if let Some(record) = Self::record("on_add", object) {
            self.apply(self.engine.update_record(&record));
        }
    }

    /// An address record changed. Resyncs that change nothing are ignored.
    pub fn on_update(&self, old: WatchedObject, new: WatchedObject) {
        if old == new {
            trace!(kind = new.kind(), "ignoring unchanged update");
            return;
        }
        if let Some(record) = Self::record("on_update", new) {
            self.apply(self.engine.update_record(&record));
        }
    }

    /// An address record disappeared. Tombstones are unwrapped.
    pub fn on_delete(&self, object: WatchedObject) {
        if let Some(record) = Self::record("on_delete", object) {
            self.apply(self.engine.delete_record(&record));
        }
    }

    fn record(operation: &'static str, object: WatchedObject) -> Option<AddressRecord> {
        match object.into_record() {
            Ok(record) => Some(record),
            Err(kind) => {
                let err = XdsError::UnexpectedObject { operation, kind };
                error!(error = %err, "ignoring address change");
                None
            }
        }
    }

    /// Recompute after an address change and publish if anything moved.
    fn apply(&self, affected: bool) {
        if !affected {
            self.metrics.refresh_suppressed();
            trace!("address change affects no cluster");
            return;
        }

        let changed = {
            let _writer = self.writer.lock();
            let recalculated = self.engine.recalculate();
            let mut published = self.published.write();
            let mut merged = published.clone();
            for (name, cla) in recalculated {
                let cla = reuse(&published, &name, cla);
                merged.insert(name, cla);
            }
            let changed = !equal(&published, &merged);
            if changed {
                *published = merged;
            }
            changed
        };

        if !changed {
            self.metrics.refresh_suppressed();
            debug!("recalculated load assignments unchanged");
            return;
        }
        self.notify();
    }

    fn notify(&self) {
        let observer = self.observer.read().as_ref().and_then(Weak::upgrade);
        match observer {
            Some(observer) => observer.refresh(),
            None => warn!("load assignments changed but no observer is registered"),
        }
    }
}

/// The published handle for `name` when it already holds `cla`, so
/// downstream stores see an unchanged assignment as the same `Arc`.
fn reuse(published: &Published, name: &str, cla: ClusterLoadAssignment) -> Arc<ClusterLoadAssignment> {
    match published.get(name) {
        Some(current) if **current == cla => Arc::clone(current),
        _ => Arc::new(cla),
    }
}

/// Same keys, and each value structurally equal.
fn equal(a: &Published, b: &Published) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && (Arc::ptr_eq(va, vb) || va == vb))
}

impl TypedResourceCache for EndpointTranslator {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Endpoint
    }

    fn on_change(&self, dag: &Dag) {
        let _writer = self.writer.lock();
        if let Err(e) = self.engine.set_clusters(dag.service_clusters()) {
            warn!(error = %e, "service clusters failed validation");
        }
        let recalculated = self.engine.recalculate();
        let mut published = self.published.write();
        let rebuilt: Published = recalculated
            .into_iter()
            .map(|(name, cla)| {
                let cla = reuse(&published, &name, cla);
                (name, cla)
            })
            .collect();
        debug!(count = rebuilt.len(), "rebuilt load assignments");
        *published = rebuilt;
    }

    fn contents(&self) -> Vec<BoxResource> {
        self.published
            .read()
            .values()
            .map(|cla| Arc::clone(cla) as BoxResource)
            .collect()
    }

    /// Unknown names map to an empty assignment: no known backends yet.
    fn query(&self, names: &[String]) -> Vec<BoxResource> {
        let published = self.published.read();
        sorted_names(names)
            .into_iter()
            .map(|name| match published.get(name) {
                Some(cla) => Arc::clone(cla) as BoxResource,
                None => Arc::new(translate::empty_load_assignment(name)) as BoxResource,
            })
            .collect()
    }
}
