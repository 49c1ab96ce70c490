//! # xds-controller
//!
//! Turns the routing graph and backing address records into versioned
//! snapshots for the xDS serving layer.
//!
//! - [`TypedResourceCache`] - One cache per resource kind, rebuilt from the
//!   graph on every change: [`ClusterCache`], [`ListenerCache`],
//!   [`RouteCache`], [`SecretCache`], [`RuntimeCache`] and the endpoint
//!   [`EndpointTranslator`]
//! - [`LoadAssignmentCache`] - Incremental load assignment engine behind
//!   the endpoint cache
//! - [`SnapshotCoordinator`] - Publishes cache contents as snapshots, in
//!   either the shared or the split design
//!
//! ## Example
//!
//! ```rust
//! use xds_cache::Request;
//! use xds_controller::{ControllerConfig, SnapshotCoordinator};
//! use xds_core::ResourceKind;
//! use xds_dag::Dag;
//!
//! let coordinator = SnapshotCoordinator::new(ControllerConfig::default()).unwrap();
//! coordinator.on_change(&Dag::default());
//!
//! let cache = coordinator.cache();
//! let listeners = cache
//!     .fetch(&Request::new(coordinator.node(), ResourceKind::Listener))
//!     .unwrap();
//! assert_eq!(listeners.names(), ["stats-health"]);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod cluster;
pub mod config;
mod coordinator;
pub mod endpoint;
mod listener;
pub mod metrics;
mod route;
mod runtime;
mod secret;
mod translate;

pub use cache::TypedResourceCache;
pub use cluster::ClusterCache;
pub use config::{CacheMode, ControllerConfig, RuntimeSettings, StatsListenerConfig};
pub use coordinator::SnapshotCoordinator;
pub use endpoint::{EndpointTranslator, LoadAssignmentCache, Observer};
pub use listener::{ListenerCache, STATS_LISTENER};
pub use route::RouteCache;
pub use runtime::{RuntimeCache, RUNTIME_LAYER};
pub use secret::SecretCache;
