//! # xds-dag
//!
//! Read-only inputs of the ingress cache layer:
//!
//! - [`Dag`] - The resolved routing graph, rebuilt by the graph-construction
//!   collaborator and never mutated by the caches
//! - [`ServiceCluster`] / [`WeightedService`] - Routing targets whose load
//!   assignments are computed from backing address records
//! - [`Endpoints`] / [`EndpointSlice`] - Backing address records delivered by
//!   the address watch
//!
//! ## Example
//!
//! ```rust
//! use xds_dag::{Cluster, Dag, Listener, Route, Service, VirtualHost};
//!
//! let dag = Dag::builder()
//!     .listener(Listener::http(vec![VirtualHost::new(
//!         "example.com",
//!         vec![Route::prefix("/", vec![Cluster::new(Service::new("default", "simple", 80))])],
//!     )]))
//!     .build();
//!
//! assert_eq!(dag.clusters().len(), 1);
//! assert_eq!(dag.service_clusters()[0].name, "default/simple");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod address;
mod graph;
mod service;

pub use address::{
    AddressRecord, EndpointPort, EndpointSlice, EndpointSubset, Endpoints, Protocol,
    SliceEndpoint, WatchedObject,
};
pub use graph::{
    Cluster, Dag, DagBuilder, ExtensionCluster, Listener, LoadBalancerPolicy, Route, Secret,
    SecureVirtualHost, Service, TcpProxy, Vertex, VirtualHost, HTTPS_LISTENER, HTTP_LISTENER,
};
pub use service::{ServiceCluster, ServiceName, WeightedService};
