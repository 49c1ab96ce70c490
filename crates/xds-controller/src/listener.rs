//! Listener cache.
//!
//! Each graph listener becomes one Envoy listener whose filter chains are
//! collected by visiting its hosts in order:
//!
//! - plaintext virtual hosts share one chain with an HTTP connection manager
//!   fetching the `ingress_http` route configuration;
//! - each TLS virtual host gets a chain matched by SNI, either terminating
//!   TLS with its secret and fetching `https/<fqdn>`, or forwarding the raw
//!   stream to its passthrough clusters;
//! - a listener-level TCP proxy gets a catch-all chain.
//!
//! A listener that ends up with no chains is omitted.

use std::sync::Arc;

use tracing::{debug, warn};
use xds_core::{BoxResource, ResourceKind};
use xds_dag::{self as dag, Dag, HTTP_LISTENER};
use xds_types::envoy::config::core::v3::TransportSocket;
use xds_types::envoy::config::listener::v3::{
    Filter, FilterChain, FilterChainMatch, Listener, ListenerFilter,
};
use xds_types::envoy::config::route::v3::{
    Route, RouteAction, RouteConfiguration, RouteMatch, VirtualHost,
};
use xds_types::envoy::extensions::filters::network::http_connection_manager::v3::HttpConnectionManager;
use xds_types::envoy::extensions::transport_sockets::tls::v3::{
    CommonTlsContext, DownstreamTlsContext,
};
use xds_types::{to_any, type_url};

use crate::cache::{ResourceStore, TypedResourceCache};
use crate::config::ControllerConfig;
use crate::route::https_route_config_name;
use crate::translate;

/// Name of the static stats and health listener.
pub const STATS_LISTENER: &str = "stats-health";

/// Holds one listener per graph listener plus the static stats listener.
#[derive(Debug, Default)]
pub struct ListenerCache {
    store: ResourceStore<Listener>,
}

impl ListenerCache {
    /// Create a cache serving the static listeners `config` asks for.
    pub fn new(config: &ControllerConfig) -> Self {
        let statics = config
            .stats_listener
            .as_ref()
            .map(|stats| stats_listener(&stats.address, stats.port, &config.admin_cluster));
        Self {
            store: ResourceStore::with_statics(statics),
        }
    }

    /// Look up a listener by name.
    pub fn get(&self, name: &str) -> Option<Arc<Listener>> {
        self.store.get(name)
    }
}

impl TypedResourceCache for ListenerCache {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Listener
    }

    fn on_change(&self, dag: &Dag) {
        let listeners: Vec<Listener> = dag.listeners().iter().filter_map(listener).collect();
        debug!(count = listeners.len(), "rebuilt listeners");
        self.store.replace(listeners);
    }

    fn contents(&self) -> Vec<BoxResource> {
        self.store.contents()
    }

    fn query(&self, names: &[String]) -> Vec<BoxResource> {
        self.store.query(names)
    }
}

/// Listener serving `/stats` and `/ready` from the admin cluster.
fn stats_listener(address: &str, port: u32, admin_cluster: &str) -> Listener {
    let route = |prefix: &str| Route {
        r#match: Some(RouteMatch {
            prefix: prefix.to_string(),
        }),
        route: Some(RouteAction {
            cluster: admin_cluster.to_string(),
            ..Default::default()
        }),
        name: String::new(),
    };
    let hcm = HttpConnectionManager {
        stat_prefix: STATS_LISTENER.to_string(),
        rds: None,
        route_config: Some(RouteConfiguration {
            name: STATS_LISTENER.to_string(),
            virtual_hosts: vec![VirtualHost {
                name: "backend".to_string(),
                domains: vec!["*".to_string()],
                routes: vec![route("/ready"), route("/stats")],
            }],
        }),
    };

    Listener {
        name: STATS_LISTENER.to_string(),
        address: Some(translate::socket_address(address, port)),
        filter_chains: vec![FilterChain {
            filters: vec![Filter {
                name: translate::HTTP_CONNECTION_MANAGER.to_string(),
                typed_config: Some(to_any(type_url::HTTP_CONNECTION_MANAGER, &hcm)),
            }],
            ..Default::default()
        }],
        listener_filters: Vec::new(),
    }
}

fn downstream_tls(secret_name: String) -> TransportSocket {
    let context = DownstreamTlsContext {
        common_tls_context: Some(CommonTlsContext {
            alpn_protocols: vec!["h2".to_string(), "http/1.1".to_string()],
            tls_certificate_sds_secret_configs: vec![translate::sds_secret(secret_name)],
        }),
    };
    TransportSocket {
        name: translate::TLS_TRANSPORT_SOCKET.to_string(),
        typed_config: Some(to_any(type_url::DOWNSTREAM_TLS_CONTEXT, &context)),
    }
}

fn sni_match(fqdn: &str) -> Option<FilterChainMatch> {
    Some(FilterChainMatch {
        transport_protocol: "tls".to_string(),
        server_names: vec![fqdn.to_string()],
    })
}

/// Filter chain for one TLS virtual host, or `None` when it can neither
/// terminate nor forward.
fn secure_filter_chain(svh: &dag::SecureVirtualHost) -> Option<FilterChain> {
    let fqdn = &svh.host.name;

    if let Some(proxy) = svh.passthrough.as_ref().filter(|p| !p.clusters.is_empty()) {
        return Some(FilterChain {
            filter_chain_match: sni_match(fqdn),
            filters: vec![translate::tcp_proxy(&format!("tcp/{fqdn}"), proxy)],
            transport_socket: None,
            name: format!("passthrough/{fqdn}"),
        });
    }

    let Some(secret) = &svh.secret else {
        warn!(host = %fqdn, "secure virtual host has neither a secret nor passthrough, skipping");
        return None;
    };

    let route_config = https_route_config_name(fqdn);
    Some(FilterChain {
        filter_chain_match: sni_match(fqdn),
        filters: vec![translate::http_connection_manager(
            dag::HTTPS_LISTENER,
            &route_config,
        )],
        transport_socket: Some(downstream_tls(secret.name())),
        name: route_config,
    })
}

fn listener(l: &dag::Listener) -> Option<Listener> {
    let mut filter_chains = Vec::new();

    if !l.virtual_hosts.is_empty() {
        filter_chains.push(FilterChain {
            filters: vec![translate::http_connection_manager(&l.name, HTTP_LISTENER)],
            ..Default::default()
        });
    }

    let secure: Vec<FilterChain> = l
        .secure_virtual_hosts
        .iter()
        .filter_map(secure_filter_chain)
        .collect();
    let inspect_tls = !secure.is_empty();
    filter_chains.extend(secure);

    if let Some(proxy) = l.tcp_proxy.as_ref().filter(|p| !p.clusters.is_empty()) {
        filter_chains.push(FilterChain {
            filters: vec![translate::tcp_proxy(&l.name, proxy)],
            ..Default::default()
        });
    }

    if filter_chains.is_empty() {
        debug!(listener = %l.name, "listener has no filter chains, omitting");
        return None;
    }

    let listener_filters = if inspect_tls {
        vec![ListenerFilter {
            name: translate::TLS_INSPECTOR.to_string(),
            typed_config: Some(prost_types::Any {
                type_url: type_url::TLS_INSPECTOR.to_string(),
                value: Vec::new(),
            }),
        }]
    } else {
        Vec::new()
    };

    Some(Listener {
        name: l.name.clone(),
        address: Some(translate::socket_address(&l.address, l.port)),
        filter_chains,
        listener_filters,
    })
}
