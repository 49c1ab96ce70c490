//! The [`Resource`] trait implemented by every proxy-ready resource.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::ResourceKind;

/// A proxy-ready resource held by a cache.
///
/// Implementations must encode deterministically: two structurally equal
/// resources produce identical bytes. The caches rely on this to detect
/// no-op updates and to keep replayed responses byte-stable.
pub trait Resource: Send + Sync + fmt::Debug {
    /// The kind of this resource.
    fn kind(&self) -> ResourceKind;

    /// The resource name, unique within its kind.
    fn name(&self) -> &str;

    /// Encode to a protobuf `Any`.
    fn encode(&self) -> prost_types::Any;

    /// Convert to Any for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// The type URL for this resource.
    fn type_url(&self) -> &'static str {
        self.kind().type_url()
    }
}

/// Shared handle to a resource. Snapshots and caches hand out clones of the
/// `Arc`, never of the resource itself.
pub type BoxResource = Arc<dyn Resource>;

/// Structural equality of two resources, judged by their encoding.
#[must_use]
pub fn encoded_eq(a: &dyn Resource, b: &dyn Resource) -> bool {
    a.kind() == b.kind() && a.name() == b.name() && a.encode() == b.encode()
}
