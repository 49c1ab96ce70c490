//! Endpoint load assignments.
//!
//! [`LoadAssignmentCache`] tracks which service clusters depend on which
//! backing address records and recomputes only the stale ones.
//! [`EndpointTranslator`] publishes the results as the endpoint
//! [`TypedResourceCache`](crate::TypedResourceCache) and tells an
//! [`Observer`] when they actually change.

mod engine;
mod translator;

pub use engine::LoadAssignmentCache;
pub use translator::{EndpointTranslator, Observer};
