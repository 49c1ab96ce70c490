//! # xds-core
//!
//! Core types, traits, and error handling shared by every crate of the
//! ingress cache layer:
//!
//! - [`XdsError`] - Error taxonomy with gRPC status code mapping
//! - [`ResourceKind`] / [`TypeUrl`] - The six resource kinds served over xDS
//! - [`ResourceVersion`] - Opaque, unique version identifiers
//! - [`NodeHash`] - Key under which snapshots are published
//! - [`Resource`] - Trait implemented by every proxy-ready resource
//!
//! ## Example
//!
//! ```rust
//! use xds_core::{NodeHash, ResourceKind, ResourceVersion};
//!
//! let node = NodeHash::from_id("contour");
//! let v1 = ResourceVersion::generate();
//! let v2 = ResourceVersion::generate();
//!
//! assert_ne!(v1, v2);
//! assert_eq!(ResourceKind::Endpoint.short_name(), "ClusterLoadAssignment");
//! assert!(!node.is_wildcard());
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod node;
mod resource;
mod type_url;
mod version;

pub use error::XdsError;
pub use node::NodeHash;
pub use resource::{encoded_eq, BoxResource, Resource};
pub use type_url::{ResourceKind, TypeUrl};
pub use version::ResourceVersion;

/// Result type alias using [`XdsError`].
pub type Result<T> = std::result::Result<T, XdsError>;

/// Alias for Result used throughout the workspace.
pub type XdsResult<T> = Result<T>;
