//! # xds-cache
//!
//! Stores that the serving layer reads published configuration from.
//!
//! - [`SnapshotCache`] - Versioned, immutable snapshots keyed by node
//! - [`LinearCache`] - Incremental store for a single, high-churn resource kind
//! - [`MuxCache`] - Routes each request by resource kind to a backing store
//! - [`Watch`] - Subscription to version changes of one resource kind
//!
//! All three stores implement [`Cache`], so the serving layer sees a single
//! capability surface no matter how the stores are composed.
//!
//! ## Key Design Decisions
//!
//! - Snapshots are immutable and atomically replaced
//! - A rejected snapshot leaves the previous one in place
//! - No lock is held while notifying watches
//!
//! ## Example
//!
//! ```rust
//! use xds_cache::{Cache, Request, Snapshot, SnapshotCache};
//! use xds_core::{NodeHash, ResourceKind};
//!
//! let cache = SnapshotCache::new();
//! let node = NodeHash::from_id("contour");
//!
//! let snapshot = Snapshot::builder()
//!     .version("v1")
//!     .resources(ResourceKind::Cluster, vec![])
//!     .build();
//! cache.set_snapshot(node, snapshot).unwrap();
//!
//! let response = cache.fetch(&Request::new(node, ResourceKind::Cluster)).unwrap();
//! assert_eq!(response.version.as_str(), "v1");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod linear;
mod mux;
mod snapshot;
mod stats;
mod watch;

pub use cache::{Cache, Request, Response, SnapshotCache};
pub use linear::LinearCache;
pub use mux::{MuxCache, MuxCacheBuilder};
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotResources};
pub use stats::CacheStats;
pub use watch::{Update, Watch, WatchId, WatchManager};
