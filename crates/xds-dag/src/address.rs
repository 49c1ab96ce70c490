//! Backing address records delivered by the address watch.
//!
//! Two record shapes exist. [`Endpoints`] is one record per service holding
//! subsets of ready and not-ready addresses. [`EndpointSlice`] partitions a
//! service's addresses across several independently-maintained records, so
//! the same address and port may appear in more than one slice.

use crate::service::ServiceName;

/// Transport protocol of an endpoint port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// TCP.
    #[default]
    Tcp,
    /// UDP.
    Udp,
    /// SCTP.
    Sctp,
}

/// A port exposed by backing addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointPort {
    /// Port name; empty for an unnamed port.
    pub name: String,
    /// Port number.
    pub port: u32,
    /// Transport protocol.
    pub protocol: Protocol,
}

impl EndpointPort {
    /// A TCP port.
    pub fn tcp(name: impl Into<String>, port: u32) -> Self {
        Self {
            name: name.into(),
            port,
            protocol: Protocol::Tcp,
        }
    }

    /// A UDP port.
    pub fn udp(name: impl Into<String>, port: u32) -> Self {
        Self {
            name: name.into(),
            port,
            protocol: Protocol::Udp,
        }
    }
}

/// A group of addresses sharing one port set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointSubset {
    /// Ready addresses.
    pub addresses: Vec<String>,
    /// Addresses that are not ready to serve.
    pub not_ready_addresses: Vec<String>,
    /// Ports exposed by every address in the subset.
    pub ports: Vec<EndpointPort>,
}

/// Per-service address record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Endpoints {
    /// Namespace and name; equal to the owning service's.
    pub name: ServiceName,
    /// Address subsets.
    pub subsets: Vec<EndpointSubset>,
}

impl Endpoints {
    /// An empty record for a service.
    pub fn new(name: ServiceName) -> Self {
        Self {
            name,
            subsets: Vec::new(),
        }
    }

    /// Add a subset of ready addresses.
    #[must_use]
    pub fn with_subset<I, S>(mut self, addresses: I, ports: Vec<EndpointPort>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subsets.push(EndpointSubset {
            addresses: addresses.into_iter().map(Into::into).collect(),
            not_ready_addresses: Vec::new(),
            ports,
        });
        self
    }
}

/// One endpoint within an [`EndpointSlice`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SliceEndpoint {
    /// Addresses of this endpoint.
    pub addresses: Vec<String>,
    /// Ready condition. Unknown readiness is treated as ready.
    pub ready: Option<bool>,
}

impl SliceEndpoint {
    /// Whether this endpoint may receive traffic.
    pub fn is_ready(&self) -> bool {
        self.ready.unwrap_or(true)
    }
}

/// One partition of a service's addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointSlice {
    /// Namespace and name of the slice itself.
    pub name: ServiceName,
    /// Name of the service this slice belongs to.
    pub service_name: String,
    /// Endpoints in the slice.
    pub endpoints: Vec<SliceEndpoint>,
    /// Ports exposed by every endpoint in the slice.
    pub ports: Vec<EndpointPort>,
}

impl EndpointSlice {
    /// An empty slice belonging to `service`.
    pub fn new(service: &ServiceName, slice_name: impl Into<String>) -> Self {
        Self {
            name: ServiceName::new(service.namespace.clone(), slice_name),
            service_name: service.name.clone(),
            endpoints: Vec::new(),
            ports: Vec::new(),
        }
    }

    /// The owning service.
    pub fn service(&self) -> ServiceName {
        ServiceName::new(self.name.namespace.clone(), self.service_name.clone())
    }

    /// Add an endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, address: impl Into<String>, ready: Option<bool>) -> Self {
        self.endpoints.push(SliceEndpoint {
            addresses: vec![address.into()],
            ready,
        });
        self
    }

    /// Set the ports.
    #[must_use]
    pub fn with_ports(mut self, ports: Vec<EndpointPort>) -> Self {
        self.ports = ports;
        self
    }
}

/// A backing address record of either shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddressRecord {
    /// Per-service record.
    Endpoints(Endpoints),
    /// One partition of a service's addresses.
    Slice(EndpointSlice),
}

impl AddressRecord {
    /// The service whose addresses this record describes.
    pub fn service(&self) -> ServiceName {
        match self {
            Self::Endpoints(e) => e.name.clone(),
            Self::Slice(s) => s.service(),
        }
    }
}

impl From<Endpoints> for AddressRecord {
    fn from(e: Endpoints) -> Self {
        Self::Endpoints(e)
    }
}

impl From<EndpointSlice> for AddressRecord {
    fn from(s: EndpointSlice) -> Self {
        Self::Slice(s)
    }
}

/// An object delivered by the address watch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchedObject {
    /// A per-service record.
    Endpoints(Endpoints),
    /// A slice record.
    EndpointSlice(EndpointSlice),
    /// A deleted object whose final state is unknown.
    Tombstone(Box<WatchedObject>),
    /// Any other kind of object.
    Other {
        /// The object's kind.
        kind: String,
    },
}

impl WatchedObject {
    /// Unwrap tombstones and convert to an address record.
    pub fn into_record(self) -> Result<AddressRecord, String> {
        match self {
            Self::Endpoints(e) => Ok(AddressRecord::Endpoints(e)),
            Self::EndpointSlice(s) => Ok(AddressRecord::Slice(s)),
            Self::Tombstone(inner) => inner.into_record(),
            Self::Other { kind } => Err(kind),
        }
    }

    /// Kind name used in diagnostics.
    pub fn kind(&self) -> &str {
        match self {
            Self::Endpoints(_) => "Endpoints",
            Self::EndpointSlice(_) => "EndpointSlice",
            Self::Tombstone(inner) => inner.kind(),
            Self::Other { kind } => kind,
        }
    }
}

impl From<Endpoints> for WatchedObject {
    fn from(e: Endpoints) -> Self {
        Self::Endpoints(e)
    }
}

impl From<EndpointSlice> for WatchedObject {
    fn from(s: EndpointSlice) -> Self {
        Self::EndpointSlice(s)
    }
}
