//! Pure translation of graph vertices into Envoy messages.

use std::time::Duration;

use xds_dag as dag;
use xds_types::envoy::config::cluster::v3::{Cluster, DiscoveryType, EdsClusterConfig, LbPolicy};
use xds_types::envoy::config::core::v3::{
    Address, ConfigSource, DataSource, SocketAddress, TransportSocket,
};
use xds_types::envoy::config::endpoint::v3::{
    ClusterLoadAssignment, Endpoint, HealthCheckConfig, LbEndpoint,
};
use xds_types::envoy::config::listener::v3::Filter;
use xds_types::envoy::config::route::v3::{
    ClusterWeight, Route, RouteAction, RouteMatch, VirtualHost, WeightedCluster,
};
use xds_types::envoy::extensions::filters::network::http_connection_manager::v3::{
    HttpConnectionManager, Rds,
};
use xds_types::envoy::extensions::filters::network::tcp_proxy::v3::TcpProxy;
use xds_types::envoy::extensions::transport_sockets::tls::v3::{
    CommonTlsContext, SdsSecretConfig, Secret, TlsCertificate, UpstreamTlsContext,
};
use xds_types::{to_any, type_url};

pub(crate) const HTTP_CONNECTION_MANAGER: &str = "envoy.filters.network.http_connection_manager";
pub(crate) const TCP_PROXY: &str = "envoy.filters.network.tcp_proxy";
pub(crate) const TLS_INSPECTOR: &str = "envoy.filters.listener.tls_inspector";
pub(crate) const TLS_TRANSPORT_SOCKET: &str = "envoy.transport_sockets.tls";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) fn duration(d: Duration) -> prost_types::Duration {
    prost_types::Duration {
        seconds: i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        nanos: i32::try_from(d.subsec_nanos()).unwrap_or(0),
    }
}

pub(crate) fn socket_address(address: &str, port: u32) -> Address {
    Address {
        socket_address: Some(SocketAddress {
            address: address.to_string(),
            port_value: port,
            ..Default::default()
        }),
    }
}

fn lb_policy(policy: dag::LoadBalancerPolicy) -> i32 {
    match policy {
        dag::LoadBalancerPolicy::RoundRobin => LbPolicy::RoundRobin as i32,
        dag::LoadBalancerPolicy::LeastRequest => LbPolicy::LeastRequest as i32,
        dag::LoadBalancerPolicy::Random => LbPolicy::Random as i32,
    }
}

fn upstream_tls(sni: &str) -> TransportSocket {
    let context = UpstreamTlsContext {
        common_tls_context: Some(CommonTlsContext::default()),
        sni: sni.to_string(),
    };
    TransportSocket {
        name: TLS_TRANSPORT_SOCKET.to_string(),
        typed_config: Some(to_any(type_url::UPSTREAM_TLS_CONTEXT, &context)),
    }
}

fn eds_cluster(
    name: String,
    service_name: String,
    load_balancer: dag::LoadBalancerPolicy,
    sni: Option<&str>,
) -> Cluster {
    Cluster {
        alt_stat_name: name.replace('/', "_"),
        name,
        r#type: DiscoveryType::Eds as i32,
        eds_cluster_config: Some(EdsClusterConfig {
            eds_config: Some(ConfigSource::ads()),
            service_name,
        }),
        connect_timeout: Some(duration(CONNECT_TIMEOUT)),
        lb_policy: lb_policy(load_balancer),
        transport_socket: sni.map(upstream_tls),
        load_assignment: None,
    }
}

/// An EDS cluster fed by the cluster's load assignment.
pub(crate) fn cluster(c: &dag::Cluster) -> Cluster {
    eds_cluster(
        c.name(),
        c.load_assignment_name(),
        c.load_balancer,
        c.sni.as_deref(),
    )
}

/// An EDS cluster fed by the extension's service cluster.
pub(crate) fn extension_cluster(ext: &dag::ExtensionCluster) -> Cluster {
    eds_cluster(
        ext.name.clone(),
        ext.upstream.name.clone(),
        ext.load_balancer,
        ext.sni.as_deref(),
    )
}

pub(crate) fn secret(s: &dag::Secret) -> Secret {
    Secret {
        name: s.name(),
        tls_certificate: Some(TlsCertificate {
            certificate_chain: Some(DataSource {
                inline_bytes: s.certificate_chain.clone(),
            }),
            private_key: Some(DataSource {
                inline_bytes: s.private_key.clone(),
            }),
        }),
    }
}

pub(crate) fn sds_secret(name: String) -> SdsSecretConfig {
    SdsSecretConfig {
        name,
        sds_config: Some(ConfigSource::ads()),
    }
}

/// Cluster weights, with unset weights shared equally when none is set.
fn weights(clusters: &[dag::Cluster]) -> WeightedCluster {
    let rebalance = clusters.iter().all(|c| c.weight == 0);
    WeightedCluster {
        clusters: clusters
            .iter()
            .map(|c| ClusterWeight {
                name: c.name(),
                weight: Some(if rebalance { 1 } else { c.weight }),
            })
            .collect(),
    }
}

/// HTTP connection manager fetching its routes over RDS.
pub(crate) fn http_connection_manager(stat_prefix: &str, route_config_name: &str) -> Filter {
    let hcm = HttpConnectionManager {
        stat_prefix: stat_prefix.to_string(),
        rds: Some(Rds {
            config_source: Some(ConfigSource::ads()),
            route_config_name: route_config_name.to_string(),
        }),
        route_config: None,
    };
    Filter {
        name: HTTP_CONNECTION_MANAGER.to_string(),
        typed_config: Some(to_any(type_url::HTTP_CONNECTION_MANAGER, &hcm)),
    }
}

pub(crate) fn tcp_proxy(stat_prefix: &str, proxy: &dag::TcpProxy) -> Filter {
    let mut tcp = TcpProxy {
        stat_prefix: stat_prefix.to_string(),
        ..Default::default()
    };
    match proxy.clusters.as_slice() {
        [single] => tcp.cluster = single.name(),
        many => tcp.weighted_clusters = Some(weights(many)),
    }
    Filter {
        name: TCP_PROXY.to_string(),
        typed_config: Some(to_any(type_url::TCP_PROXY, &tcp)),
    }
}

pub(crate) fn route(r: &dag::Route) -> Route {
    let mut action = RouteAction {
        timeout: r.timeout.map(duration),
        ..Default::default()
    };
    match r.clusters.as_slice() {
        [single] => action.cluster = single.name(),
        many => action.weighted_clusters = Some(weights(many)),
    }
    Route {
        r#match: Some(RouteMatch {
            prefix: r.prefix.clone(),
        }),
        route: Some(action),
        name: String::new(),
    }
}

/// A virtual host with routes ordered longest prefix first. Routes without
/// clusters have nowhere to go and are dropped.
pub(crate) fn virtual_host(vh: &dag::VirtualHost) -> VirtualHost {
    let mut routes: Vec<&dag::Route> = vh.routes.iter().filter(|r| !r.clusters.is_empty()).collect();
    routes.sort_by(|a, b| {
        b.prefix
            .len()
            .cmp(&a.prefix.len())
            .then_with(|| a.prefix.cmp(&b.prefix))
    });
    VirtualHost {
        name: vh.name.clone(),
        domains: vec![vh.name.clone()],
        routes: routes.into_iter().map(route).collect(),
    }
}

/// An empty load assignment for `name`.
pub(crate) fn empty_load_assignment(name: &str) -> ClusterLoadAssignment {
    ClusterLoadAssignment {
        cluster_name: name.to_string(),
        endpoints: Vec::new(),
    }
}

/// One upstream host, with a health check override when the health port
/// differs from the serving port.
pub(crate) fn lb_endpoint(address: &str, port: u32, health_port: u32) -> LbEndpoint {
    let health_check_config = (health_port != 0 && health_port != port).then_some(HealthCheckConfig {
        port_value: health_port,
    });
    LbEndpoint {
        endpoint: Some(Endpoint {
            address: Some(socket_address(address, port)),
            health_check_config,
        }),
        ..Default::default()
    }
}
