//! Snapshot: immutable, versioned bundle of resources.
//!
//! A snapshot holds one resource set per [`ResourceKind`]. Each set is kept
//! ordered by resource name so that repeated reads of the same snapshot
//! produce identical output.

use std::collections::BTreeMap;
use std::time::Instant;

use xds_core::{BoxResource, ResourceKind, ResourceVersion, XdsError, XdsResult};

/// Resources of one kind within a snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotResources {
    version: ResourceVersion,
    resources: BTreeMap<String, BoxResource>,
    duplicates: Vec<String>,
}

impl SnapshotResources {
    fn new(version: ResourceVersion) -> Self {
        Self {
            version,
            resources: BTreeMap::new(),
            duplicates: Vec::new(),
        }
    }

    fn insert(&mut self, resource: BoxResource) {
        let name = resource.name().to_string();
        if self.resources.insert(name.clone(), resource).is_some() {
            self.duplicates.push(name);
        }
    }

    /// Version of this resource set.
    #[inline]
    pub fn version(&self) -> &ResourceVersion {
        &self.version
    }

    /// Number of resources.
    #[inline]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether there are no resources.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Look up a resource by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&BoxResource> {
        self.resources.get(name)
    }

    /// Iterate resources in name order.
    pub fn iter(&self) -> impl Iterator<Item = &BoxResource> {
        self.resources.values()
    }

    /// Resource names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// All resources, in name order.
    pub fn to_vec(&self) -> Vec<BoxResource> {
        self.resources.values().cloned().collect()
    }

    /// The requested resources in name order; unknown names are skipped.
    pub fn select(&self, names: &[String]) -> Vec<BoxResource> {
        if names.is_empty() {
            return self.to_vec();
        }
        let mut selected: Vec<BoxResource> = names
            .iter()
            .filter_map(|name| self.resources.get(name).cloned())
            .collect();
        selected.sort_by(|a, b| a.name().cmp(b.name()));
        selected.dedup_by(|a, b| a.name() == b.name());
        selected
    }
}

/// An immutable snapshot of resources.
#[derive(Debug, Clone)]
pub struct Snapshot {
    version: ResourceVersion,
    resources: BTreeMap<ResourceKind, SnapshotResources>,
    created_at: Instant,
}

impl Snapshot {
    /// Create a new snapshot builder.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Global version of this snapshot.
    #[inline]
    pub fn version(&self) -> &ResourceVersion {
        &self.version
    }

    /// Creation timestamp.
    #[inline]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Resources of one kind.
    #[inline]
    pub fn get_resources(&self, kind: ResourceKind) -> Option<&SnapshotResources> {
        self.resources.get(&kind)
    }

    /// Version of one kind.
    #[inline]
    pub fn get_version(&self, kind: ResourceKind) -> Option<&ResourceVersion> {
        self.resources.get(&kind).map(SnapshotResources::version)
    }

    /// Whether this snapshot covers `kind`.
    #[inline]
    pub fn contains_kind(&self, kind: ResourceKind) -> bool {
        self.resources.contains_key(&kind)
    }

    /// Kinds covered by this snapshot, in canonical order.
    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.resources.keys().copied()
    }

    /// Total number of resources across all kinds.
    pub fn total_resources(&self) -> usize {
        self.resources.values().map(SnapshotResources::len).sum()
    }

    /// Whether the snapshot holds no resources at all.
    pub fn is_empty(&self) -> bool {
        self.resources.values().all(SnapshotResources::is_empty)
    }

    /// Check the snapshot is internally consistent.
    ///
    /// Every resource must have a non-empty name, be filed under its own
    /// kind, and be the only resource of that name within its kind.
    pub fn validate(&self) -> XdsResult<()> {
        let reject = |reason: String| XdsError::SnapshotRejected {
            version: self.version.to_string(),
            reason,
        };

        for (kind, set) in &self.resources {
            if let Some(name) = set.duplicates.first() {
                return Err(reject(format!("duplicate {kind} {name:?}")));
            }
            for (name, resource) in &set.resources {
                if name.is_empty() {
                    return Err(reject(format!("{kind} with empty name")));
                }
                if resource.kind() != *kind {
                    return Err(reject(format!(
                        "{} {name:?} filed under {kind}",
                        resource.kind()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Builder for creating snapshots.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    version: ResourceVersion,
    resources: BTreeMap<ResourceKind, SnapshotResources>,
}

impl SnapshotBuilder {
    /// Create a new snapshot builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global version. Kinds added afterwards inherit it.
    pub fn version(mut self, version: impl Into<ResourceVersion>) -> Self {
        self.version = version.into();
        self
    }

    /// Add the resources of one kind, replacing any set added before.
    pub fn resources(
        mut self,
        kind: ResourceKind,
        resources: impl IntoIterator<Item = BoxResource>,
    ) -> Self {
        let mut set = SnapshotResources::new(self.version.clone());
        for resource in resources {
            set.insert(resource);
        }
        self.resources.insert(kind, set);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> Snapshot {
        Snapshot {
            version: self.version,
            resources: self.resources,
            created_at: Instant::now(),
        }
    }
}
