//! Route cache.

use std::sync::Arc;

use tracing::debug;
use xds_core::{BoxResource, ResourceKind};
use xds_dag::{Dag, HTTP_LISTENER};
use xds_types::envoy::config::route::v3::RouteConfiguration;

use crate::cache::{ResourceStore, TypedResourceCache};
use crate::translate;

/// Name of the route configuration serving `fqdn` over TLS.
pub(crate) fn https_route_config_name(fqdn: &str) -> String {
    format!("https/{fqdn}")
}

/// Holds the plaintext route configuration and one per TLS host.
///
/// The plaintext configuration is always present, even with no virtual
/// hosts, because the HTTP listener references it unconditionally.
#[derive(Debug, Default)]
pub struct RouteCache {
    store: ResourceStore<RouteConfiguration>,
}

impl RouteCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a route configuration by name.
    pub fn get(&self, name: &str) -> Option<Arc<RouteConfiguration>> {
        self.store.get(name)
    }
}

impl TypedResourceCache for RouteCache {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Route
    }

    fn on_change(&self, dag: &Dag) {
        let mut http = RouteConfiguration {
            name: HTTP_LISTENER.to_string(),
            virtual_hosts: Vec::new(),
        };
        let mut configs = Vec::new();

        for listener in dag.listeners() {
            http.virtual_hosts
                .extend(listener.virtual_hosts.iter().map(translate::virtual_host));

            for svh in &listener.secure_virtual_hosts {
                // Passthrough hosts are never terminated, so they have no routes.
                if svh.passthrough.is_some() || svh.secret.is_none() {
                    continue;
                }
                configs.push(RouteConfiguration {
                    name: https_route_config_name(&svh.host.name),
                    virtual_hosts: vec![translate::virtual_host(&svh.host)],
                });
            }
        }

        http.virtual_hosts.sort_by(|a, b| a.name.cmp(&b.name));
        configs.push(http);
        debug!(count = configs.len(), "rebuilt route configurations");
        self.store.replace(configs);
    }

    fn contents(&self) -> Vec<BoxResource> {
        self.store.contents()
    }

    fn query(&self, names: &[String]) -> Vec<BoxResource> {
        self.store.query(names)
    }
}
