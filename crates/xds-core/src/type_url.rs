//! Resource kinds and their discovery type URLs.
//!
//! The cache layer serves a closed set of six resource kinds. Each kind has
//! a fixed type URL that discovery requests use to classify themselves.

use std::fmt;

use crate::XdsError;

/// One of the six resource kinds served by the cache layer.
///
/// The derived ordering is the order in which kinds are listed in
/// snapshots and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Cluster (CDS).
    Cluster,
    /// ClusterLoadAssignment (EDS).
    Endpoint,
    /// Listener (LDS).
    Listener,
    /// RouteConfiguration (RDS).
    Route,
    /// Secret (SDS).
    Secret,
    /// Runtime (RTDS).
    Runtime,
}

impl ResourceKind {
    /// Every kind, in canonical order.
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Cluster,
        ResourceKind::Endpoint,
        ResourceKind::Listener,
        ResourceKind::Route,
        ResourceKind::Secret,
        ResourceKind::Runtime,
    ];

    /// The type URL discovery requests carry for this kind.
    #[must_use]
    pub const fn type_url(self) -> &'static str {
        match self {
            ResourceKind::Cluster => TypeUrl::CLUSTER,
            ResourceKind::Endpoint => TypeUrl::ENDPOINT,
            ResourceKind::Listener => TypeUrl::LISTENER,
            ResourceKind::Route => TypeUrl::ROUTE,
            ResourceKind::Secret => TypeUrl::SECRET,
            ResourceKind::Runtime => TypeUrl::RUNTIME,
        }
    }

    /// Resolve a type URL back to its kind.
    pub fn from_type_url(type_url: &str) -> Result<Self, XdsError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.type_url() == type_url)
            .ok_or_else(|| XdsError::InvalidTypeUrl {
                type_url: type_url.to_string(),
            })
    }

    /// Message name without the package prefix.
    #[must_use]
    pub fn short_name(self) -> &'static str {
        let url = self.type_url();
        url.rsplit('.').next().unwrap_or(url)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Type URL wrapper for requests that arrive as strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeUrl(String);

impl TypeUrl {
    /// Type URL for Cluster (CDS).
    pub const CLUSTER: &'static str = "type.googleapis.com/envoy.config.cluster.v3.Cluster";

    /// Type URL for ClusterLoadAssignment (EDS).
    pub const ENDPOINT: &'static str =
        "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment";

    /// Type URL for Listener (LDS).
    pub const LISTENER: &'static str = "type.googleapis.com/envoy.config.listener.v3.Listener";

    /// Type URL for RouteConfiguration (RDS).
    pub const ROUTE: &'static str =
        "type.googleapis.com/envoy.config.route.v3.RouteConfiguration";

    /// Type URL for Secret (SDS).
    pub const SECRET: &'static str =
        "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.Secret";

    /// Type URL for Runtime (RTDS).
    pub const RUNTIME: &'static str = "type.googleapis.com/envoy.service.runtime.v3.Runtime";

    /// Create a new type URL from a string.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Get the type URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The resource kind this URL names, if it is one we serve.
    pub fn kind(&self) -> Result<ResourceKind, XdsError> {
        ResourceKind::from_type_url(&self.0)
    }
}

impl From<ResourceKind> for TypeUrl {
    fn from(kind: ResourceKind) -> Self {
        Self(kind.type_url().to_string())
    }
}

impl From<&str> for TypeUrl {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for TypeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TypeUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
