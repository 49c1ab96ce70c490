//! # nebucloud-ingress
//!
//! Resource caches and snapshot distribution for an Envoy ingress control
//! plane.
//!
//! A routing graph goes in, versioned xDS snapshots come out. Address
//! changes for backing services are recomputed incrementally and, in the
//! default split layout, republished without touching clusters, listeners,
//! routes or secrets.
//!
//! ## Quick Start
//!
//! ```rust
//! use nebucloud_ingress::prelude::*;
//!
//! let coordinator = SnapshotCoordinator::new(ControllerConfig::default()).unwrap();
//!
//! let dag = Dag::builder()
//!     .listener(Listener::http(vec![VirtualHost::new(
//!         "*",
//!         vec![Route::prefix(
//!             "/",
//!             vec![Cluster::new(Service::new("default", "simple", 80))],
//!         )],
//!     )]))
//!     .build();
//! coordinator.on_change(&dag);
//!
//! coordinator.endpoints().on_add(
//!     Endpoints::new(ServiceName::new("default", "simple"))
//!         .with_subset(["192.168.183.24"], vec![EndpointPort::tcp("", 8080)])
//!         .into(),
//! );
//!
//! let response = coordinator
//!     .cache()
//!     .fetch(&Request::new(coordinator.node(), ResourceKind::Endpoint))
//!     .unwrap();
//! assert_eq!(response.names(), ["default/simple"]);
//! ```
//!
//! ## Architecture
//!
//! - `xds-core` - Errors, resource kinds, versions and the `Resource` trait
//! - `xds-types` - Envoy v3 message types
//! - `xds-cache` - Snapshot, linear and multiplexing stores with watches
//! - `xds-dag` - The routing graph and backing address records
//! - `xds-controller` - Typed caches, the endpoint engine and the snapshot
//!   coordinator
//!
//! This crate re-exports all of them.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub use xds_cache as cache;
pub use xds_controller as controller;
pub use xds_core as core;
pub use xds_dag as dag;
pub use xds_types as types;

/// Prelude module for convenient imports.
///
/// ```rust
/// use nebucloud_ingress::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use xds_core::{
        BoxResource, NodeHash, Resource, ResourceKind, ResourceVersion, TypeUrl, XdsError,
        XdsResult,
    };

    // Serving stores
    pub use xds_cache::{
        Cache, CacheStats, LinearCache, MuxCache, Request, Response, Snapshot, SnapshotCache,
        Update, Watch, WatchId,
    };

    // Graph and address records
    pub use xds_dag::{
        AddressRecord, Cluster, Dag, EndpointPort, EndpointSlice, Endpoints, Listener, Route,
        Secret, SecureVirtualHost, Service, ServiceCluster, ServiceName, TcpProxy, VirtualHost,
        WatchedObject, WeightedService,
    };

    // Controller
    pub use xds_controller::{
        CacheMode, ControllerConfig, EndpointTranslator, LoadAssignmentCache, Observer,
        SnapshotCoordinator, TypedResourceCache,
    };
}

/// Version information for this crate.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Minimum supported Rust version.
    pub const MSRV: &str = "1.75";

    /// Version info as a string.
    pub fn version_string() -> String {
        format!("nebucloud-ingress {VERSION} (MSRV {MSRV})")
    }
}
