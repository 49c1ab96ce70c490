//! Service clusters: named routing targets made of weighted backends.

use std::fmt;

use xds_core::{XdsError, XdsResult};

/// Identity of a backing address source: namespace plus name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceName {
    /// Namespace of the service.
    pub namespace: String,
    /// Name of the service.
    pub name: String,
}

impl ServiceName {
    /// Create a service name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Whether both parts are set.
    pub fn is_complete(&self) -> bool {
        !self.namespace.is_empty() && !self.name.is_empty()
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// One backend of a [`ServiceCluster`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WeightedService {
    /// Relative weight; zero means "unset".
    pub weight: u32,
    /// The backing address source.
    pub service: ServiceName,
    /// Port selector. Empty selects an unnamed port, or the sole port.
    pub port_name: String,
    /// Distinct health check port selector, if any.
    pub health_port_name: Option<String>,
}

impl WeightedService {
    /// A backend selecting `port_name` on `service`, with weight unset.
    pub fn new(service: ServiceName, port_name: impl Into<String>) -> Self {
        Self {
            weight: 0,
            service,
            port_name: port_name.into(),
            health_port_name: None,
        }
    }

    /// Set the weight.
    #[must_use]
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Set a health check port selector.
    #[must_use]
    pub fn with_health_port(mut self, port_name: impl Into<String>) -> Self {
        self.health_port_name = Some(port_name.into());
        self
    }

    /// The health port selector when it differs from the main selector.
    pub fn distinct_health_port(&self) -> Option<&str> {
        self.health_port_name
            .as_deref()
            .filter(|name| *name != self.port_name)
    }
}

/// A named routing target aggregating weighted backends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceCluster {
    /// Cluster name; the key of its load assignment.
    pub name: String,
    /// Backends in declaration order.
    pub services: Vec<WeightedService>,
}

impl ServiceCluster {
    /// Create a service cluster.
    pub fn new(name: impl Into<String>, services: Vec<WeightedService>) -> Self {
        Self {
            name: name.into(),
            services,
        }
    }

    /// Check the cluster can be indexed.
    pub fn validate(&self) -> XdsResult<()> {
        if self.name.is_empty() {
            return Err(XdsError::invalid_cluster(&self.name, "cluster name is empty"));
        }
        if self.services.is_empty() {
            return Err(XdsError::invalid_cluster(&self.name, "cluster has no backends"));
        }
        if let Some(service) = self.services.iter().find(|s| !s.service.is_complete()) {
            return Err(XdsError::invalid_cluster(
                &self.name,
                format!("backend {:?} has an incomplete service name", service.service.to_string()),
            ));
        }
        Ok(())
    }

    /// Give every backend weight 1 when all weights are zero. Explicit
    /// nonzero weights are never altered.
    pub fn rebalance(&mut self) {
        if self.services.iter().all(|s| s.weight == 0) {
            for service in &mut self.services {
                service.weight = 1;
            }
        }
    }

    /// Whether `service` backs this cluster.
    pub fn references(&self, service: &ServiceName) -> bool {
        self.services.iter().any(|s| s.service == *service)
    }
}
