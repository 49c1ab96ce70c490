//! Runtime cache.

use std::collections::BTreeMap;

use prost_types::{value::Kind, Struct, Value};
use tracing::debug;
use xds_core::{BoxResource, ResourceKind};
use xds_dag::Dag;
use xds_types::envoy::service::runtime::v3::Runtime;

use crate::cache::{ResourceStore, TypedResourceCache};
use crate::config::RuntimeSettings;

/// Name of the runtime layer served to proxies.
pub const RUNTIME_LAYER: &str = "dynamic";

fn number(n: u32) -> Value {
    Value {
        kind: Some(Kind::NumberValue(f64::from(n))),
    }
}

fn layer(settings: &RuntimeSettings) -> Runtime {
    let mut fields = BTreeMap::new();
    fields.insert(
        "re2.max_program_size.error_level".to_string(),
        number(settings.max_regex_program_size),
    );
    fields.insert(
        "re2.max_program_size.warn_level".to_string(),
        number(settings.warn_regex_program_size),
    );
    if let Some(max) = settings.max_requests_per_io_cycle {
        fields.insert("http.max_requests_per_io_cycle".to_string(), number(max));
    }
    Runtime {
        name: RUNTIME_LAYER.to_string(),
        layer: Some(Struct { fields }),
    }
}

/// Holds the single runtime layer rendered from configuration.
///
/// The layer does not depend on the routing graph, so graph rebuilds leave
/// it untouched.
#[derive(Debug, Default)]
pub struct RuntimeCache {
    store: ResourceStore<Runtime>,
}

impl RuntimeCache {
    /// Create a cache serving a layer rendered from `settings`.
    pub fn new(settings: &RuntimeSettings) -> Self {
        let cache = Self::default();
        cache.update_settings(settings);
        cache
    }

    /// Re-render the layer.
    pub fn update_settings(&self, settings: &RuntimeSettings) {
        debug!(layer = RUNTIME_LAYER, "rendered runtime layer");
        self.store.replace([layer(settings)]);
    }
}

impl TypedResourceCache for RuntimeCache {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Runtime
    }

    fn on_change(&self, _dag: &Dag) {}

    fn contents(&self) -> Vec<BoxResource> {
        self.store.contents()
    }

    fn query(&self, names: &[String]) -> Vec<BoxResource> {
        self.store.query(names)
    }
}
