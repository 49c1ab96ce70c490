//! Shared fixtures for the integration tests.

use std::sync::Arc;

use nebucloud_ingress::prelude::*;
use xds_types::envoy::config::core::v3::{Address, SocketAddress};
use xds_types::envoy::config::endpoint::v3::{
    ClusterLoadAssignment, Endpoint, LbEndpoint, LocalityLbEndpoints,
};
use xds_types::envoy::config::route::v3::RouteConfiguration;

/// A graph with one plaintext host routing `/` to each service's port 80.
pub fn http_dag(services: &[&str]) -> Dag {
    let routes = services
        .iter()
        .map(|s| {
            Route::prefix(
                format!("/{s}"),
                vec![Cluster::new(Service::new("default", *s, 80))],
            )
        })
        .collect();
    Dag::builder()
        .listener(Listener::http(vec![VirtualHost::new("*", routes)]))
        .build()
}

/// An `Endpoints` record for `default/<service>` on unnamed port 8080.
pub fn endpoints(service: &str, addresses: &[&str]) -> Endpoints {
    Endpoints::new(ServiceName::new("default", service))
        .with_subset(addresses.iter().copied(), vec![EndpointPort::tcp("", 8080)])
}

/// A load assignment with one host per address, all on port 8080.
pub fn load_assignment(name: &str, addresses: &[&str]) -> BoxResource {
    let lb_endpoints = addresses
        .iter()
        .map(|address| LbEndpoint {
            endpoint: Some(Endpoint {
                address: Some(Address {
                    socket_address: Some(SocketAddress {
                        address: address.to_string(),
                        port_value: 8080,
                        ..Default::default()
                    }),
                }),
                health_check_config: None,
            }),
            ..Default::default()
        })
        .collect();
    Arc::new(ClusterLoadAssignment {
        cluster_name: name.to_string(),
        endpoints: vec![LocalityLbEndpoints {
            lb_endpoints,
            ..Default::default()
        }],
    })
}

/// An empty route configuration.
pub fn route_config(name: &str) -> BoxResource {
    Arc::new(RouteConfiguration {
        name: name.to_string(),
        virtual_hosts: Vec::new(),
    })
}

/// `(address, port)` of every host in a published load assignment.
pub fn hosts(resource: &BoxResource) -> Vec<(String, u32)> {
    let Some(cla) = resource.as_any().downcast_ref::<ClusterLoadAssignment>() else {
        return Vec::new();
    };
    cla.endpoints
        .iter()
        .flat_map(|group| &group.lb_endpoints)
        .filter_map(|lb| lb.endpoint.as_ref()?.address.as_ref()?.socket_address.as_ref())
        .map(|sa| (sa.address.clone(), sa.port_value))
        .collect()
}
