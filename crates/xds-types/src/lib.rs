//! # xds-types
//!
//! Envoy v3 message types served by the ingress cache layer.
//!
//! Only the fields the cache layer populates are modelled. Field tags match
//! the Envoy data-plane API so encoded resources are wire compatible for
//! the fields present. Oneofs that the cache layer only ever populates one
//! way are flattened into their single used field.
//!
//! The six top-level messages implement [`xds_core::Resource`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)] // Field docs live in the Envoy API reference

pub use prost::Message;
pub use prost_types::Any;

use xds_core::{Resource, ResourceKind};

pub mod envoy {
    //! Envoy xDS types.

    pub mod config {
        //! Envoy configuration types.

        pub mod core {
            //! Core configuration types.

            pub mod v3 {
                //! Core v3 API.

                /// Transport protocol of a socket address.
                #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
                #[repr(i32)]
                pub enum SocketProtocol {
                    Tcp = 0,
                    Udp = 1,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct SocketAddress {
                    #[prost(enumeration = "SocketProtocol", tag = "1")]
                    pub protocol: i32,
                    #[prost(string, tag = "2")]
                    pub address: String,
                    #[prost(uint32, tag = "3")]
                    pub port_value: u32,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Address {
                    #[prost(message, optional, tag = "1")]
                    pub socket_address: Option<SocketAddress>,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Locality {
                    #[prost(string, tag = "1")]
                    pub region: String,
                    #[prost(string, tag = "2")]
                    pub zone: String,
                    #[prost(string, tag = "3")]
                    pub sub_zone: String,
                }

                /// Marker for "fetch over the aggregated stream".
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct AggregatedConfigSource {}

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct ConfigSource {
                    #[prost(message, optional, tag = "3")]
                    pub ads: Option<AggregatedConfigSource>,
                    #[prost(int32, tag = "6")]
                    pub resource_api_version: i32,
                }

                impl ConfigSource {
                    /// A config source pointing at the ADS stream, API v3.
                    #[must_use]
                    pub fn ads() -> Self {
                        Self {
                            ads: Some(AggregatedConfigSource {}),
                            resource_api_version: 2,
                        }
                    }
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct DataSource {
                    #[prost(bytes = "vec", tag = "2")]
                    pub inline_bytes: Vec<u8>,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct TransportSocket {
                    #[prost(string, tag = "1")]
                    pub name: String,
                    #[prost(message, optional, tag = "3")]
                    pub typed_config: Option<prost_types::Any>,
                }
            }
        }

        pub mod cluster {
            //! Cluster configuration.

            pub mod v3 {
                //! Cluster v3 API.

                use super::super::core::v3::{ConfigSource, TransportSocket};

                #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
                #[repr(i32)]
                pub enum DiscoveryType {
                    Static = 0,
                    StrictDns = 1,
                    LogicalDns = 2,
                    Eds = 3,
                }

                #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
                #[repr(i32)]
                pub enum LbPolicy {
                    RoundRobin = 0,
                    LeastRequest = 1,
                    RingHash = 2,
                    Random = 3,
                    Maglev = 5,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct EdsClusterConfig {
                    #[prost(message, optional, tag = "1")]
                    pub eds_config: Option<ConfigSource>,
                    #[prost(string, tag = "2")]
                    pub service_name: String,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Cluster {
                    #[prost(string, tag = "1")]
                    pub name: String,
                    #[prost(enumeration = "DiscoveryType", tag = "2")]
                    pub r#type: i32,
                    #[prost(message, optional, tag = "3")]
                    pub eds_cluster_config: Option<EdsClusterConfig>,
                    #[prost(message, optional, tag = "4")]
                    pub connect_timeout: Option<prost_types::Duration>,
                    #[prost(enumeration = "LbPolicy", tag = "6")]
                    pub lb_policy: i32,
                    #[prost(message, optional, tag = "24")]
                    pub transport_socket: Option<TransportSocket>,
                    #[prost(string, tag = "28")]
                    pub alt_stat_name: String,
                    #[prost(message, optional, tag = "33")]
                    pub load_assignment:
                        Option<super::super::endpoint::v3::ClusterLoadAssignment>,
                }
            }
        }

        pub mod endpoint {
            //! Endpoint configuration.

            pub mod v3 {
                //! Endpoint v3 API.

                use super::super::core::v3::{Address, Locality};

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct HealthCheckConfig {
                    #[prost(uint32, tag = "1")]
                    pub port_value: u32,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Endpoint {
                    #[prost(message, optional, tag = "1")]
                    pub address: Option<Address>,
                    #[prost(message, optional, tag = "2")]
                    pub health_check_config: Option<HealthCheckConfig>,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct LbEndpoint {
                    #[prost(message, optional, tag = "1")]
                    pub endpoint: Option<Endpoint>,
                    #[prost(int32, tag = "2")]
                    pub health_status: i32,
                    #[prost(message, optional, tag = "4")]
                    pub load_balancing_weight: Option<u32>,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct LocalityLbEndpoints {
                    #[prost(message, optional, tag = "1")]
                    pub locality: Option<Locality>,
                    #[prost(message, repeated, tag = "2")]
                    pub lb_endpoints: Vec<LbEndpoint>,
                    #[prost(message, optional, tag = "3")]
                    pub load_balancing_weight: Option<u32>,
                    #[prost(uint32, tag = "5")]
                    pub priority: u32,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct ClusterLoadAssignment {
                    #[prost(string, tag = "1")]
                    pub cluster_name: String,
                    #[prost(message, repeated, tag = "2")]
                    pub endpoints: Vec<LocalityLbEndpoints>,
                }
            }
        }

        pub mod listener {
            //! Listener configuration.

            pub mod v3 {
                //! Listener v3 API.

                use super::super::core::v3::{Address, TransportSocket};

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Filter {
                    #[prost(string, tag = "1")]
                    pub name: String,
                    #[prost(message, optional, tag = "4")]
                    pub typed_config: Option<prost_types::Any>,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct FilterChainMatch {
                    #[prost(string, tag = "9")]
                    pub transport_protocol: String,
                    #[prost(string, repeated, tag = "11")]
                    pub server_names: Vec<String>,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct FilterChain {
                    #[prost(message, optional, tag = "1")]
                    pub filter_chain_match: Option<FilterChainMatch>,
                    #[prost(message, repeated, tag = "3")]
                    pub filters: Vec<Filter>,
                    #[prost(message, optional, tag = "6")]
                    pub transport_socket: Option<TransportSocket>,
                    #[prost(string, tag = "7")]
                    pub name: String,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct ListenerFilter {
                    #[prost(string, tag = "1")]
                    pub name: String,
                    #[prost(message, optional, tag = "3")]
                    pub typed_config: Option<prost_types::Any>,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Listener {
                    #[prost(string, tag = "1")]
                    pub name: String,
                    #[prost(message, optional, tag = "2")]
                    pub address: Option<Address>,
                    #[prost(message, repeated, tag = "3")]
                    pub filter_chains: Vec<FilterChain>,
                    #[prost(message, repeated, tag = "9")]
                    pub listener_filters: Vec<ListenerFilter>,
                }
            }
        }

        pub mod route {
            //! Route configuration.

            pub mod v3 {
                //! Route v3 API.

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct RouteMatch {
                    #[prost(string, tag = "1")]
                    pub prefix: String,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct ClusterWeight {
                    #[prost(string, tag = "1")]
                    pub name: String,
                    #[prost(message, optional, tag = "2")]
                    pub weight: Option<u32>,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct WeightedCluster {
                    #[prost(message, repeated, tag = "1")]
                    pub clusters: Vec<ClusterWeight>,
                }

                /// Only one of `cluster` and `weighted_clusters` is set.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct RouteAction {
                    #[prost(string, tag = "1")]
                    pub cluster: String,
                    #[prost(message, optional, tag = "3")]
                    pub weighted_clusters: Option<WeightedCluster>,
                    #[prost(message, optional, tag = "8")]
                    pub timeout: Option<prost_types::Duration>,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Route {
                    #[prost(message, optional, tag = "1")]
                    pub r#match: Option<RouteMatch>,
                    #[prost(message, optional, tag = "2")]
                    pub route: Option<RouteAction>,
                    #[prost(string, tag = "14")]
                    pub name: String,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct VirtualHost {
                    #[prost(string, tag = "1")]
                    pub name: String,
                    #[prost(string, repeated, tag = "2")]
                    pub domains: Vec<String>,
                    #[prost(message, repeated, tag = "3")]
                    pub routes: Vec<Route>,
                }

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct RouteConfiguration {
                    #[prost(string, tag = "1")]
                    pub name: String,
                    #[prost(message, repeated, tag = "2")]
                    pub virtual_hosts: Vec<VirtualHost>,
                }
            }
        }
    }

    pub mod extensions {
        //! Extension configuration embedded in listeners and clusters.

        pub mod filters {
            //! Network filters.

            pub mod network {
                //! Network filter configs.

                pub mod http_connection_manager {
                    //! HTTP connection manager.

                    pub mod v3 {
                        //! HTTP connection manager v3 API.

                        use crate::envoy::config::core::v3::ConfigSource;

                        #[derive(Clone, PartialEq, ::prost::Message)]
                        pub struct Rds {
                            #[prost(message, optional, tag = "1")]
                            pub config_source: Option<ConfigSource>,
                            #[prost(string, tag = "2")]
                            pub route_config_name: String,
                        }

                        #[derive(Clone, PartialEq, ::prost::Message)]
                        pub struct HttpConnectionManager {
                            #[prost(string, tag = "2")]
                            pub stat_prefix: String,
                            #[prost(message, optional, tag = "3")]
                            pub rds: Option<Rds>,
                            #[prost(message, optional, tag = "4")]
                            pub route_config:
                                Option<crate::envoy::config::route::v3::RouteConfiguration>,
                        }
                    }
                }

                pub mod tcp_proxy {
                    //! TCP proxy.

                    pub mod v3 {
                        //! TCP proxy v3 API.

                        use crate::envoy::config::route::v3::WeightedCluster;

                        /// Only one of `cluster` and `weighted_clusters` is set.
                        #[derive(Clone, PartialEq, ::prost::Message)]
                        pub struct TcpProxy {
                            #[prost(string, tag = "1")]
                            pub stat_prefix: String,
                            #[prost(string, tag = "2")]
                            pub cluster: String,
                            #[prost(message, optional, tag = "10")]
                            pub weighted_clusters: Option<WeightedCluster>,
                        }
                    }
                }
            }
        }

        pub mod transport_sockets {
            //! Transport sockets.

            pub mod tls {
                //! TLS transport socket.

                pub mod v3 {
                    //! TLS v3 API.

                    use crate::envoy::config::core::v3::{ConfigSource, DataSource};

                    #[derive(Clone, PartialEq, ::prost::Message)]
                    pub struct TlsCertificate {
                        #[prost(message, optional, tag = "1")]
                        pub certificate_chain: Option<DataSource>,
                        #[prost(message, optional, tag = "2")]
                        pub private_key: Option<DataSource>,
                    }

                    #[derive(Clone, PartialEq, ::prost::Message)]
                    pub struct Secret {
                        #[prost(string, tag = "1")]
                        pub name: String,
                        #[prost(message, optional, tag = "2")]
                        pub tls_certificate: Option<TlsCertificate>,
                    }

                    #[derive(Clone, PartialEq, ::prost::Message)]
                    pub struct SdsSecretConfig {
                        #[prost(string, tag = "1")]
                        pub name: String,
                        #[prost(message, optional, tag = "2")]
                        pub sds_config: Option<ConfigSource>,
                    }

                    #[derive(Clone, PartialEq, ::prost::Message)]
                    pub struct CommonTlsContext {
                        #[prost(string, repeated, tag = "4")]
                        pub alpn_protocols: Vec<String>,
                        #[prost(message, repeated, tag = "6")]
                        pub tls_certificate_sds_secret_configs: Vec<SdsSecretConfig>,
                    }

                    #[derive(Clone, PartialEq, ::prost::Message)]
                    pub struct DownstreamTlsContext {
                        #[prost(message, optional, tag = "1")]
                        pub common_tls_context: Option<CommonTlsContext>,
                    }

                    #[derive(Clone, PartialEq, ::prost::Message)]
                    pub struct UpstreamTlsContext {
                        #[prost(message, optional, tag = "1")]
                        pub common_tls_context: Option<CommonTlsContext>,
                        #[prost(string, tag = "2")]
                        pub sni: String,
                    }
                }
            }
        }
    }

    pub mod service {
        //! Envoy discovery service payloads.

        pub mod runtime {
            //! Runtime discovery.

            pub mod v3 {
                //! Runtime v3 API.

                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Runtime {
                    #[prost(string, tag = "1")]
                    pub name: String,
                    #[prost(message, optional, tag = "2")]
                    pub layer: Option<prost_types::Struct>,
                }
            }
        }
    }
}

use envoy::config::cluster::v3::Cluster;
use envoy::config::endpoint::v3::ClusterLoadAssignment;
use envoy::config::listener::v3::Listener;
use envoy::config::route::v3::RouteConfiguration;
use envoy::extensions::transport_sockets::tls::v3::Secret;
use envoy::service::runtime::v3::Runtime;

/// Pack a message into an `Any` under the given type URL.
#[must_use]
pub fn to_any<M: Message>(type_url: &str, message: &M) -> Any {
    Any {
        type_url: type_url.to_string(),
        value: message.encode_to_vec(),
    }
}

macro_rules! impl_resource {
    ($($ty:ty => $kind:expr, $name:ident;)*) => {
        $(
            impl Resource for $ty {
                fn kind(&self) -> ResourceKind {
                    $kind
                }

                fn name(&self) -> &str {
                    &self.$name
                }

                fn encode(&self) -> Any {
                    to_any($kind.type_url(), self)
                }

                fn as_any(&self) -> &dyn std::any::Any {
                    self
                }
            }
        )*
    };
}

impl_resource! {
    Cluster => ResourceKind::Cluster, name;
    ClusterLoadAssignment => ResourceKind::Endpoint, cluster_name;
    Listener => ResourceKind::Listener, name;
    RouteConfiguration => ResourceKind::Route, name;
    Secret => ResourceKind::Secret, name;
    Runtime => ResourceKind::Runtime, name;
}

/// Type URLs of messages embedded in `Any` fields.
pub mod type_url {
    pub const HTTP_CONNECTION_MANAGER: &str = "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager";
    pub const TCP_PROXY: &str =
        "type.googleapis.com/envoy.extensions.filters.network.tcp_proxy.v3.TcpProxy";
    pub const DOWNSTREAM_TLS_CONTEXT: &str =
        "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.DownstreamTlsContext";
    pub const UPSTREAM_TLS_CONTEXT: &str =
        "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.UpstreamTlsContext";
    pub const TLS_INSPECTOR: &str =
        "type.googleapis.com/envoy.extensions.filters.listener.tls_inspector.v3.TlsInspector";
}
