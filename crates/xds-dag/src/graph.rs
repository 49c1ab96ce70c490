//! The routing graph.
//!
//! The graph is a closed set of vertex kinds rooted at listeners and
//! extension clusters. Consumers walk it with [`Dag::walk`], an explicit
//! depth-first traversal that visits vertices in declaration order.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::service::{ServiceCluster, ServiceName, WeightedService};

/// Name of the plaintext HTTP listener.
pub const HTTP_LISTENER: &str = "ingress_http";
/// Name of the TLS listener.
pub const HTTPS_LISTENER: &str = "ingress_https";

/// Upstream load balancing policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoadBalancerPolicy {
    /// Round robin.
    #[default]
    RoundRobin,
    /// Least request.
    LeastRequest,
    /// Random.
    Random,
}

/// A port on a service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Service {
    /// The service.
    pub name: ServiceName,
    /// Service port number.
    pub port: u32,
    /// Service port name; empty when the port is unnamed.
    pub port_name: String,
}

impl Service {
    /// An unnamed port on a service.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, port: u32) -> Self {
        Self {
            name: ServiceName::new(namespace, name),
            port,
            port_name: String::new(),
        }
    }

    /// Name the port.
    #[must_use]
    pub fn with_port_name(mut self, port_name: impl Into<String>) -> Self {
        self.port_name = port_name.into();
        self
    }
}

/// An upstream cluster: one port on one service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cluster {
    /// The upstream service port.
    pub upstream: Service,
    /// Relative weight among the clusters of a route; zero means unset.
    pub weight: u32,
    /// Distinct health check port name.
    pub health_port_name: Option<String>,
    /// Load balancing policy.
    pub load_balancer: LoadBalancerPolicy,
    /// SNI to present when the upstream speaks TLS.
    pub sni: Option<String>,
}

impl Cluster {
    /// A cluster for an upstream service port.
    pub fn new(upstream: Service) -> Self {
        Self {
            upstream,
            ..Self::default()
        }
    }

    /// Set the weight.
    #[must_use]
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Set a distinct health check port.
    #[must_use]
    pub fn with_health_port(mut self, port_name: impl Into<String>) -> Self {
        self.health_port_name = Some(port_name.into());
        self
    }

    /// Cluster name, `<namespace>/<service>/<port>`.
    pub fn name(&self) -> String {
        format!("{}/{}", self.upstream.name, self.upstream.port)
    }

    /// Name of the load assignment that feeds this cluster:
    /// `<namespace>/<service>`, or `<namespace>/<service>/<port-name>` for a
    /// named port.
    pub fn load_assignment_name(&self) -> String {
        if self.upstream.port_name.is_empty() {
            self.upstream.name.to_string()
        } else {
            format!("{}/{}", self.upstream.name, self.upstream.port_name)
        }
    }

    /// The single-backend service cluster feeding this cluster.
    pub fn service_cluster(&self) -> ServiceCluster {
        ServiceCluster::new(
            self.load_assignment_name(),
            vec![WeightedService {
                weight: 1,
                service: self.upstream.name.clone(),
                port_name: self.upstream.port_name.clone(),
                health_port_name: self.health_port_name.clone(),
            }],
        )
    }
}

/// A route: a path prefix forwarding to one or more clusters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Route {
    /// Path prefix.
    pub prefix: String,
    /// Target clusters.
    pub clusters: Vec<Cluster>,
    /// Upstream response timeout.
    pub timeout: Option<Duration>,
}

impl Route {
    /// A prefix route.
    pub fn prefix(prefix: impl Into<String>, clusters: Vec<Cluster>) -> Self {
        Self {
            prefix: prefix.into(),
            clusters,
            timeout: None,
        }
    }
}

/// A plaintext virtual host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VirtualHost {
    /// Fully qualified domain name, or `*`.
    pub name: String,
    /// Routes.
    pub routes: Vec<Route>,
}

impl VirtualHost {
    /// A virtual host.
    pub fn new(name: impl Into<String>, routes: Vec<Route>) -> Self {
        Self {
            name: name.into(),
            routes,
        }
    }
}

/// A TLS certificate and key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Secret {
    /// Source object identity.
    pub source: ServiceName,
    /// PEM certificate chain.
    pub certificate_chain: Vec<u8>,
    /// PEM private key.
    pub private_key: Vec<u8>,
}

impl Secret {
    /// Secret name, `<namespace>/<name>`.
    pub fn name(&self) -> String {
        self.source.to_string()
    }
}

/// A TCP proxy target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TcpProxy {
    /// Target clusters.
    pub clusters: Vec<Cluster>,
}

/// A virtual host served over TLS.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecureVirtualHost {
    /// Host name and routes.
    pub host: VirtualHost,
    /// Certificate; absent for passthrough.
    pub secret: Option<Secret>,
    /// Forward the TLS stream untouched to these clusters.
    pub passthrough: Option<TcpProxy>,
}

/// A listener and the hosts it serves.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listener {
    /// Listener name.
    pub name: String,
    /// Bind address.
    pub address: String,
    /// Bind port.
    pub port: u32,
    /// Plaintext virtual hosts.
    pub virtual_hosts: Vec<VirtualHost>,
    /// TLS virtual hosts.
    pub secure_virtual_hosts: Vec<SecureVirtualHost>,
    /// Raw TCP forwarding.
    pub tcp_proxy: Option<TcpProxy>,
}

impl Listener {
    /// The plaintext listener on `0.0.0.0:8080`.
    pub fn http(virtual_hosts: Vec<VirtualHost>) -> Self {
        Self {
            name: HTTP_LISTENER.to_string(),
            address: "0.0.0.0".to_string(),
            port: 8080,
            virtual_hosts,
            ..Self::default()
        }
    }

    /// The TLS listener on `0.0.0.0:8443`.
    pub fn https(secure_virtual_hosts: Vec<SecureVirtualHost>) -> Self {
        Self {
            name: HTTPS_LISTENER.to_string(),
            address: "0.0.0.0".to_string(),
            port: 8443,
            secure_virtual_hosts,
            ..Self::default()
        }
    }
}

/// A cluster an extension service talks to, backed by a service cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtensionCluster {
    /// Cluster name.
    pub name: String,
    /// Backends.
    pub upstream: ServiceCluster,
    /// Load balancing policy.
    pub load_balancer: LoadBalancerPolicy,
    /// SNI to present upstream.
    pub sni: Option<String>,
}

/// A vertex of the routing graph.
#[derive(Clone, Copy, Debug)]
pub enum Vertex<'a> {
    /// Listener.
    Listener(&'a Listener),
    /// Plaintext virtual host.
    VirtualHost(&'a VirtualHost),
    /// TLS virtual host.
    SecureVirtualHost(&'a SecureVirtualHost),
    /// Route.
    Route(&'a Route),
    /// TCP proxy.
    TcpProxy(&'a TcpProxy),
    /// Upstream cluster.
    Cluster(&'a Cluster),
    /// TLS secret.
    Secret(&'a Secret),
    /// Extension cluster.
    ExtensionCluster(&'a ExtensionCluster),
}

impl<'a> Vertex<'a> {
    fn push_children(self, stack: &mut Vec<Vertex<'a>>) {
        match self {
            Vertex::Listener(l) => {
                stack.extend(l.virtual_hosts.iter().map(Vertex::VirtualHost));
                stack.extend(l.secure_virtual_hosts.iter().map(Vertex::SecureVirtualHost));
                stack.extend(l.tcp_proxy.iter().map(Vertex::TcpProxy));
            }
            Vertex::VirtualHost(vh) => stack.extend(vh.routes.iter().map(Vertex::Route)),
            Vertex::SecureVirtualHost(svh) => {
                stack.extend(svh.secret.iter().map(Vertex::Secret));
                stack.extend(svh.host.routes.iter().map(Vertex::Route));
                stack.extend(svh.passthrough.iter().map(Vertex::TcpProxy));
            }
            Vertex::Route(r) => stack.extend(r.clusters.iter().map(Vertex::Cluster)),
            Vertex::TcpProxy(t) => stack.extend(t.clusters.iter().map(Vertex::Cluster)),
            Vertex::Cluster(_) | Vertex::Secret(_) | Vertex::ExtensionCluster(_) => {}
        }
    }
}

/// The resolved routing graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dag {
    listeners: Vec<Listener>,
    extension_clusters: Vec<ExtensionCluster>,
}

impl Dag {
    /// Create a builder.
    pub fn builder() -> DagBuilder {
        DagBuilder::default()
    }

    /// Listeners, in declaration order.
    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    /// Extension clusters, in declaration order.
    pub fn extension_clusters(&self) -> &[ExtensionCluster] {
        &self.extension_clusters
    }

    /// Visit every vertex depth first, parents before children, siblings in
    /// declaration order.
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(Vertex<'a>)) {
        let mut stack: Vec<Vertex<'a>> = Vec::new();
        stack.extend(self.extension_clusters.iter().rev().map(Vertex::ExtensionCluster));
        stack.extend(self.listeners.iter().rev().map(Vertex::Listener));

        while let Some(vertex) = stack.pop() {
            let base = stack.len();
            vertex.push_children(&mut stack);
            stack[base..].reverse();
            visit(vertex);
        }
    }

    /// Every cluster reachable from a listener, one per cluster name,
    /// ordered by name.
    pub fn clusters(&self) -> Vec<&Cluster> {
        let mut clusters = BTreeMap::new();
        self.walk(|v| {
            if let Vertex::Cluster(c) = v {
                clusters.entry(c.name()).or_insert(c);
            }
        });
        clusters.into_values().collect()
    }

    /// Every secret reachable from a listener, one per name, ordered by name.
    pub fn secrets(&self) -> Vec<&Secret> {
        let mut secrets = BTreeMap::new();
        self.walk(|v| {
            if let Vertex::Secret(s) = v {
                secrets.entry(s.name()).or_insert(s);
            }
        });
        secrets.into_values().collect()
    }

    /// The service clusters whose load assignments the endpoint cache
    /// computes: one per cluster load assignment name, plus the upstream of
    /// every extension cluster. Ordered by name.
    pub fn service_clusters(&self) -> Vec<ServiceCluster> {
        let mut service_clusters = BTreeMap::new();
        self.walk(|v| match v {
            Vertex::Cluster(c) => {
                service_clusters
                    .entry(c.load_assignment_name())
                    .or_insert_with(|| c.service_cluster());
            }
            Vertex::ExtensionCluster(ext) => {
                service_clusters
                    .entry(ext.upstream.name.clone())
                    .or_insert_with(|| ext.upstream.clone());
            }
            _ => {}
        });
        service_clusters.into_values().collect()
    }
}

/// Builder for [`Dag`].
#[derive(Debug, Default)]
pub struct DagBuilder {
    dag: Dag,
}

impl DagBuilder {
    /// Add a listener.
    pub fn listener(mut self, listener: Listener) -> Self {
        self.dag.listeners.push(listener);
        self
    }

    /// Add an extension cluster.
    pub fn extension_cluster(mut self, cluster: ExtensionCluster) -> Self {
        self.dag.extension_clusters.push(cluster);
        self
    }

    /// Build the graph.
    pub fn build(self) -> Dag {
        self.dag
    }
}
