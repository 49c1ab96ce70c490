//! The typed cache capability and the store every cache is built on.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;
use xds_core::{BoxResource, Resource, ResourceKind};
use xds_dag::Dag;

/// A cache holding the current proxy-ready resources of one kind.
///
/// `contents` and `query` return resources ordered by name, so repeated
/// calls against unchanged state produce identical output.
pub trait TypedResourceCache: Send + Sync {
    /// The kind this cache holds.
    fn kind(&self) -> ResourceKind;

    /// Type URL the discovery protocol classifies requests by.
    fn type_url(&self) -> &'static str {
        self.kind().type_url()
    }

    /// Rebuild the cache from the routing graph. Readers observe either the
    /// old or the new resource set, never a mix.
    fn on_change(&self, dag: &Dag);

    /// Every resource held, static ones included.
    fn contents(&self) -> Vec<BoxResource>;

    /// The named resources.
    fn query(&self, names: &[String]) -> Vec<BoxResource>;
}

/// Sorted, de-duplicated copy of `names`.
pub(crate) fn sorted_names(names: &[String]) -> Vec<&str> {
    let mut names: Vec<&str> = names.iter().map(String::as_str).collect();
    names.sort_unstable();
    names.dedup();
    names
}

/// Name-keyed resource map behind one lock, plus an immutable set of static
/// resources that graph rebuilds never touch.
#[derive(Debug)]
pub(crate) struct ResourceStore<T> {
    values: Mutex<BTreeMap<String, Arc<T>>>,
    statics: BTreeMap<String, Arc<T>>,
}

impl<T> Default for ResourceStore<T> {
    fn default() -> Self {
        Self {
            values: Mutex::new(BTreeMap::new()),
            statics: BTreeMap::new(),
        }
    }
}

impl<T: Resource + 'static> ResourceStore<T> {
    /// A store that always serves `statics`.
    pub(crate) fn with_statics(statics: impl IntoIterator<Item = T>) -> Self {
        Self {
            values: Mutex::new(BTreeMap::new()),
            statics: statics
                .into_iter()
                .map(|r| (r.name().to_string(), Arc::new(r)))
                .collect(),
        }
    }

    /// Swap in a new dynamic set. Unnamed resources and names taken by a
    /// static resource are skipped.
    pub(crate) fn replace(&self, values: impl IntoIterator<Item = T>) {
        let mut next = BTreeMap::new();
        for value in values {
            if value.name().is_empty() {
                warn!(kind = %value.kind(), "skipping resource with empty name");
                continue;
            }
            if self.statics.contains_key(value.name()) {
                warn!(kind = %value.kind(), name = value.name(), "name is reserved for a static resource");
                continue;
            }
            next.insert(value.name().to_string(), Arc::new(value));
        }
        *self.values.lock() = next;
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<T>> {
        if let Some(value) = self.statics.get(name) {
            return Some(Arc::clone(value));
        }
        self.values.lock().get(name).cloned()
    }

    pub(crate) fn contents(&self) -> Vec<BoxResource> {
        let values = self.values.lock();
        let mut all: Vec<(&String, &Arc<T>)> = values.iter().chain(self.statics.iter()).collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all.into_iter()
            .map(|(_, v)| Arc::clone(v) as BoxResource)
            .collect()
    }

    /// The named resources; unknown names are omitted.
    pub(crate) fn query(&self, names: &[String]) -> Vec<BoxResource> {
        let values = self.values.lock();
        sorted_names(names)
            .into_iter()
            .filter_map(|name| self.statics.get(name).or_else(|| values.get(name)))
            .map(|v| Arc::clone(v) as BoxResource)
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.values.lock().len() + self.statics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xds_types::envoy::extensions::transport_sockets::tls::v3::Secret;

    fn secret(name: &str) -> Secret {
        Secret {
            name: name.to_string(),
            tls_certificate: None,
        }
    }

    fn names(resources: &[BoxResource]) -> Vec<&str> {
        resources.iter().map(|r| r.name()).collect()
    }

    #[test]
    fn contents_are_ordered() {
        let store = ResourceStore::with_statics([secret("m")]);
        store.replace([secret("z"), secret("a")]);
        assert_eq!(names(&store.contents()), ["a", "m", "z"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn replace_is_wholesale() {
        let store = ResourceStore::default();
        store.replace([secret("a"), secret("b")]);
        store.replace([secret("c")]);
        assert_eq!(names(&store.contents()), ["c"]);
        assert!(store.get("a").is_none());
    }

    #[test]
    fn replace_skips_unnamed_resources() {
        let store = ResourceStore::default();
        store.replace([secret("a"), secret(""), secret("b")]);
        assert_eq!(names(&store.contents()), ["a", "b"]);
        assert!(store.get("").is_none());
    }

    #[test]
    fn query_omits_unknown_names() {
        let store = ResourceStore::default();
        store.replace([secret("a"), secret("b")]);
        let names_in = ["b".to_string(), "x".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(names(&store.query(&names_in)), ["a", "b"]);
    }

    #[test]
    fn statics_win_name_collisions() {
        let store = ResourceStore::with_statics([secret("fixed")]);
        store.replace([secret("fixed"), secret("other")]);
        assert_eq!(names(&store.contents()), ["fixed", "other"]);
    }
}
