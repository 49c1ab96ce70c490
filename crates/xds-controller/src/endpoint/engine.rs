use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};
use xds_core::{XdsError, XdsResult};
use xds_dag::{
    AddressRecord, EndpointPort, EndpointSlice, Endpoints, Protocol, ServiceCluster, ServiceName,
    WeightedService,
};
use xds_types::envoy::config::endpoint::v3::{
    ClusterLoadAssignment, LbEndpoint, LocalityLbEndpoints,
};

use crate::metrics::ControllerMetrics;
use crate::translate;

/// The stored addresses of one service.
#[derive(Debug, Clone)]
enum AddressSource {
    Endpoints(Endpoints),
    /// Slices keyed by slice name.
    Slices(BTreeMap<String, EndpointSlice>),
}

/// Ready addresses sharing one port set.
struct Partition<'a> {
    addresses: Vec<&'a str>,
    ports: &'a [EndpointPort],
}

impl AddressSource {
    fn partitions(&self) -> Vec<Partition<'_>> {
        match self {
            Self::Endpoints(e) => e
                .subsets
                .iter()
                .map(|s| Partition {
                    addresses: s.addresses.iter().map(String::as_str).collect(),
                    ports: &s.ports,
                })
                .collect(),
            Self::Slices(slices) => slices
                .values()
                .map(|s| Partition {
                    addresses: s
                        .endpoints
                        .iter()
                        .filter(|e| e.is_ready())
                        .flat_map(|e| e.addresses.iter().map(String::as_str))
                        .collect(),
                    ports: &s.ports,
                })
                .collect(),
        }
    }
}

/// Whether `port` is the one `selector` picks among `count` ports. An
/// empty selector picks an unnamed port, or the sole port.
fn port_selected(selector: &str, port: &EndpointPort, count: usize) -> bool {
    if selector.is_empty() {
        port.name.is_empty() || count == 1
    } else {
        port.name == selector
    }
}

/// Expand a backend's addresses into sorted, de-duplicated endpoints.
fn expand(service: &WeightedService, source: &AddressSource) -> Vec<LbEndpoint> {
    let health_port_name = service.distinct_health_port();
    let mut health_port = 0;
    let mut pairs: BTreeSet<(&str, u32)> = BTreeSet::new();

    for partition in source.partitions() {
        if partition.addresses.is_empty() {
            continue;
        }
        for port in partition.ports {
            if port.protocol != Protocol::Tcp {
                continue;
            }
            if health_port_name.is_some_and(|name| name == port.name) {
                health_port = port.port;
                continue;
            }
            if !port_selected(&service.port_name, port, partition.ports.len()) {
                continue;
            }
            pairs.extend(partition.addresses.iter().map(|a| (*a, port.port)));
        }
    }

    pairs
        .into_iter()
        .map(|(address, port)| translate::lb_endpoint(address, port, health_port))
        .collect()
}

#[derive(Debug, Default)]
struct EngineState {
    /// Clusters pending recomputation, possibly repeated.
    stale: Vec<ServiceCluster>,
    /// Service to the clusters that reference it.
    index: HashMap<ServiceName, Vec<ServiceCluster>>,
    records: HashMap<ServiceName, AddressSource>,
}

impl EngineState {
    fn mark_stale(&mut self, service: &ServiceName) -> bool {
        match self.index.get(service) {
            Some(clusters) if !clusters.is_empty() => {
                self.stale.extend(clusters.iter().cloned());
                true
            }
            _ => false,
        }
    }
}

/// Incremental load assignment engine.
///
/// The stale set, the service index and the stored address records share
/// one lock, so a recalculation always sees them consistently. Address
/// records are copied on store; callers keep ownership of what they pass.
#[derive(Debug, Default)]
pub struct LoadAssignmentCache {
    state: Mutex<EngineState>,
    metrics: ControllerMetrics,
}

impl LoadAssignmentCache {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set of clusters.
    ///
    /// Valid clusters are rebalanced, indexed and marked stale. Invalid ones
    /// are logged and dropped; the first such error is returned, but the
    /// valid clusters take effect regardless.
    pub fn set_clusters(&self, clusters: impl IntoIterator<Item = ServiceCluster>) -> XdsResult<()> {
        let mut first_error: Option<XdsError> = None;
        let mut valid = Vec::new();

        for mut cluster in clusters {
            if let Err(e) = cluster.validate() {
                warn!(cluster = %cluster.name, error = %e, "dropping invalid service cluster");
                self.metrics.invalid_cluster();
                first_error.get_or_insert(e);
                continue;
            }
            cluster.rebalance();
            valid.push(cluster);
        }

        let mut index: HashMap<ServiceName, Vec<ServiceCluster>> = HashMap::new();
        for cluster in &valid {
            let services: HashSet<&ServiceName> =
                cluster.services.iter().map(|s| &s.service).collect();
            for service in services {
                index
                    .entry(service.clone())
                    .or_default()
                    .push(cluster.clone());
            }
        }

        let mut state = self.state.lock();
        debug!(clusters = valid.len(), services = index.len(), "indexed service clusters");
        state.index = index;
        state.stale = valid;
        self.metrics.stale_clusters(state.stale.len());

        first_error.map_or(Ok(()), Err)
    }

    /// Store a copy of an address record. Returns whether any cluster
    /// depends on it.
    pub fn update_record(&self, record: &AddressRecord) -> bool {
        let service = record.service();
        let mut state = self.state.lock();

        match record {
            AddressRecord::Endpoints(e) => {
                state
                    .records
                    .insert(service.clone(), AddressSource::Endpoints(e.clone()));
            }
            AddressRecord::Slice(s) => {
                let source = state
                    .records
                    .entry(service.clone())
                    .or_insert_with(|| AddressSource::Slices(BTreeMap::new()));
                if matches!(source, AddressSource::Endpoints(_)) {
                    *source = AddressSource::Slices(BTreeMap::new());
                }
                if let AddressSource::Slices(slices) = source {
                    slices.insert(s.name.name.clone(), s.clone());
                }
            }
        }

        let affected = state.mark_stale(&service);
        trace!(service = %service, affected, "updated address record");
        self.metrics.stale_clusters(state.stale.len());
        affected
    }

    /// Remove an address record. Returns whether any cluster depends on it.
    pub fn delete_record(&self, record: &AddressRecord) -> bool {
        let service = record.service();
        let mut state = self.state.lock();

        match record {
            AddressRecord::Endpoints(_) => {
                state.records.remove(&service);
            }
            AddressRecord::Slice(s) => {
                let now_empty = match state.records.get_mut(&service) {
                    Some(AddressSource::Slices(slices)) => {
                        slices.remove(&s.name.name);
                        slices.is_empty()
                    }
                    _ => false,
                };
                if now_empty {
                    state.records.remove(&service);
                }
            }
        }

        let affected = state.mark_stale(&service);
        trace!(service = %service, affected, "deleted address record");
        self.metrics.stale_clusters(state.stale.len());
        affected
    }

    /// Number of stale entries pending, duplicates included.
    pub fn stale_count(&self) -> usize {
        self.state.lock().stale.len()
    }

    /// Recompute every stale cluster and clear the stale set.
    ///
    /// A cluster marked stale more than once is computed once, from its
    /// last marking. Every stale cluster appears in the result, with no
    /// locality groups when none of its backends has a ready address.
    pub fn recalculate(&self) -> BTreeMap<String, ClusterLoadAssignment> {
        let mut state = self.state.lock();
        let stale = std::mem::take(&mut state.stale);
        self.metrics.recalculated(stale.len());

        let mut seen = HashSet::new();
        let mut assignments = BTreeMap::new();

        for cluster in stale.iter().rev() {
            if !seen.insert(cluster.name.as_str()) {
                continue;
            }

            let endpoints = cluster
                .services
                .iter()
                .filter_map(|service| {
                    let source = state.records.get(&service.service)?;
                    let lb_endpoints = expand(service, source);
                    if lb_endpoints.is_empty() {
                        return None;
                    }
                    Some(LocalityLbEndpoints {
                        lb_endpoints,
                        load_balancing_weight: (service.weight > 0).then_some(service.weight),
                        ..Default::default()
                    })
                })
                .collect();

            assignments.insert(
                cluster.name.clone(),
                ClusterLoadAssignment {
                    cluster_name: cluster.name.clone(),
                    endpoints,
                },
            );
        }

        debug!(stale = stale.len(), recalculated = assignments.len(), "recalculated load assignments");
        assignments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xds_dag::EndpointSubset;

    fn simple_cluster() -> ServiceCluster {
        ServiceCluster::new(
            "default/simple",
            vec![WeightedService::new(ServiceName::new("default", "simple"), "")],
        )
    }

    fn simple_record() -> AddressRecord {
        Endpoints::new(ServiceName::new("default", "simple"))
            .with_subset(["192.168.183.24"], vec![EndpointPort::tcp("", 8080)])
            .into()
    }

    fn addresses(cla: &ClusterLoadAssignment) -> Vec<Vec<(String, u32)>> {
        cla.endpoints
            .iter()
            .map(|group| {
                group
                    .lb_endpoints
                    .iter()
                    .map(|lb| {
                        let sa = lb
                            .endpoint
                            .as_ref()
                            .and_then(|e| e.address.as_ref())
                            .and_then(|a| a.socket_address.as_ref())
                            .unwrap();
                        (sa.address.clone(), sa.port_value)
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn simple_add_then_delete() {
        let engine = LoadAssignmentCache::new();
        engine.set_clusters([simple_cluster()]).unwrap();
        engine.recalculate();

        assert!(engine.update_record(&simple_record()));
        let result = engine.recalculate();
        let cla = &result["default/simple"];
        assert_eq!(addresses(cla), [vec![("192.168.183.24".to_string(), 8080)]]);
        assert_eq!(cla.endpoints[0].load_balancing_weight, Some(1));

        assert!(engine.delete_record(&simple_record()));
        let result = engine.recalculate();
        assert!(result["default/simple"].endpoints.is_empty());
        assert_eq!(engine.stale_count(), 0);
    }

    #[test]
    fn cartesian_expansion_selects_port() {
        let engine = LoadAssignmentCache::new();
        engine
            .set_clusters([ServiceCluster::new(
                "default/multi/a",
                vec![WeightedService::new(ServiceName::new("default", "multi"), "a")],
            )])
            .unwrap();
        engine.update_record(
            &Endpoints::new(ServiceName::new("default", "multi"))
                .with_subset(
                    ["10.0.0.2", "10.0.0.1"],
                    vec![EndpointPort::tcp("a", 8080), EndpointPort::tcp("b", 9090)],
                )
                .into(),
        );

        let result = engine.recalculate();
        assert_eq!(
            addresses(&result["default/multi/a"]),
            [vec![
                ("10.0.0.1".to_string(), 8080),
                ("10.0.0.2".to_string(), 8080)
            ]]
        );
    }

    #[test]
    fn unnamed_selector_needs_single_or_unnamed_port() {
        let engine = LoadAssignmentCache::new();
        engine.set_clusters([simple_cluster()]).unwrap();
        engine.update_record(
            &Endpoints::new(ServiceName::new("default", "simple"))
                .with_subset(["10.0.0.1"], vec![EndpointPort::tcp("http", 80), EndpointPort::tcp("https", 443)])
                .into(),
        );
        assert!(engine.recalculate()["default/simple"].endpoints.is_empty());

        engine.update_record(
            &Endpoints::new(ServiceName::new("default", "simple"))
                .with_subset(["10.0.0.1"], vec![EndpointPort::tcp("http", 80)])
                .into(),
        );
        assert_eq!(
            addresses(&engine.recalculate()["default/simple"]),
            [vec![("10.0.0.1".to_string(), 80)]]
        );
    }

    #[test]
    fn zero_weight_omits_field() {
        let engine = LoadAssignmentCache::new();
        engine
            .set_clusters([ServiceCluster::new(
                "default/weighted",
                vec![
                    WeightedService::new(ServiceName::new("default", "a"), ""),
                    WeightedService::new(ServiceName::new("default", "b"), "").with_weight(5),
                ],
            )])
            .unwrap();
        for name in ["a", "b"] {
            engine.update_record(
                &Endpoints::new(ServiceName::new("default", name))
                    .with_subset(["10.0.0.1"], vec![EndpointPort::tcp("", 80)])
                    .into(),
            );
        }

        let result = engine.recalculate();
        let weights: Vec<_> = result["default/weighted"]
            .endpoints
            .iter()
            .map(|g| g.load_balancing_weight)
            .collect();
        assert_eq!(weights, [None, Some(5)]);
    }

    #[test]
    fn skips_not_ready_and_udp() {
        let engine = LoadAssignmentCache::new();
        engine.set_clusters([simple_cluster()]).unwrap();
        let record = Endpoints {
            name: ServiceName::new("default", "simple"),
            subsets: vec![
                EndpointSubset {
                    addresses: vec![],
                    not_ready_addresses: vec!["10.0.0.9".to_string()],
                    ports: vec![EndpointPort::tcp("", 80)],
                },
                EndpointSubset {
                    addresses: vec!["10.0.0.1".to_string()],
                    not_ready_addresses: vec![],
                    ports: vec![EndpointPort::udp("", 53)],
                },
            ],
        };
        engine.update_record(&record.into());
        assert!(engine.recalculate()["default/simple"].endpoints.is_empty());
    }

    #[test]
    fn health_port_override() {
        let engine = LoadAssignmentCache::new();
        engine
            .set_clusters([ServiceCluster::new(
                "default/health/http",
                vec![WeightedService::new(ServiceName::new("default", "health"), "http")
                    .with_health_port("health")],
            )])
            .unwrap();
        engine.update_record(
            &Endpoints::new(ServiceName::new("default", "health"))
                .with_subset(
                    ["10.0.0.1"],
                    vec![EndpointPort::tcp("http", 8080), EndpointPort::tcp("health", 8998)],
                )
                .into(),
        );

        let result = engine.recalculate();
        let group = &result["default/health/http"].endpoints[0];
        assert_eq!(group.lb_endpoints.len(), 1);
        let endpoint = group.lb_endpoints[0].endpoint.as_ref().unwrap();
        assert_eq!(endpoint.health_check_config.as_ref().unwrap().port_value, 8998);
    }

    #[test]
    fn slices_are_merged_and_deduplicated() {
        let service = ServiceName::new("default", "simple");
        let ports = vec![EndpointPort::tcp("", 8080)];
        let engine = LoadAssignmentCache::new();
        engine.set_clusters([simple_cluster()]).unwrap();

        let first = EndpointSlice::new(&service, "simple-a")
            .with_endpoint("10.0.0.2", Some(true))
            .with_endpoint("10.0.0.3", Some(false))
            .with_ports(ports.clone());
        let second = EndpointSlice::new(&service, "simple-b")
            .with_endpoint("10.0.0.2", None)
            .with_endpoint("10.0.0.1", None)
            .with_ports(ports);
        engine.update_record(&first.into());
        engine.update_record(&second.clone().into());

        assert_eq!(
            addresses(&engine.recalculate()["default/simple"]),
            [vec![
                ("10.0.0.1".to_string(), 8080),
                ("10.0.0.2".to_string(), 8080)
            ]]
        );

        engine.delete_record(&second.into());
        assert_eq!(
            addresses(&engine.recalculate()["default/simple"]),
            [vec![("10.0.0.2".to_string(), 8080)]]
        );
    }

    #[test]
    fn unreferenced_record_is_not_affected() {
        let engine = LoadAssignmentCache::new();
        engine.set_clusters([simple_cluster()]).unwrap();
        engine.recalculate();

        let other: AddressRecord = Endpoints::new(ServiceName::new("default", "other"))
            .with_subset(["10.0.0.1"], vec![EndpointPort::tcp("", 80)])
            .into();
        assert!(!engine.update_record(&other));
        assert!(engine.recalculate().is_empty());
    }

    #[test]
    fn invalid_clusters_reported_valid_kept() {
        let engine = LoadAssignmentCache::new();
        let result = engine.set_clusters([
            ServiceCluster::new("", vec![]),
            simple_cluster(),
            ServiceCluster::new("default/empty", vec![]),
        ]);
        match result {
            Err(XdsError::InvalidCluster { name, .. }) => assert_eq!(name, ""),
            other => panic!("unexpected {other:?}"),
        }
        let recalculated = engine.recalculate();
        assert_eq!(recalculated.keys().collect::<Vec<_>>(), ["default/simple"]);
    }

    #[test]
    fn duplicate_stale_entries_computed_once() {
        let engine = LoadAssignmentCache::new();
        engine.set_clusters([simple_cluster()]).unwrap();
        engine.update_record(&simple_record());
        engine.update_record(&simple_record());
        assert_eq!(engine.stale_count(), 3);
        assert_eq!(engine.recalculate().len(), 1);
    }

    #[test]
    fn stale_gauge_drops_to_zero_after_recalculate() {
        let capture = crate::metrics::tests::Capture::default();
        ::metrics::with_local_recorder(&capture, || {
            let engine = LoadAssignmentCache::new();
            engine.set_clusters([simple_cluster()]).unwrap();
            engine.update_record(&simple_record());
            assert_eq!(capture.gauge("xds_stale_clusters"), Some(2.0));

            engine.recalculate();
            assert_eq!(engine.stale_count(), 0);
        });
        assert_eq!(capture.gauge("xds_stale_clusters"), Some(0.0));
        assert_eq!(capture.counter("xds_stale_clusters_drained_total"), 2);
    }

    #[test]
    fn stored_record_is_a_copy() {
        let engine = LoadAssignmentCache::new();
        engine.set_clusters([simple_cluster()]).unwrap();
        let mut record = Endpoints::new(ServiceName::new("default", "simple"))
            .with_subset(["10.0.0.1"], vec![EndpointPort::tcp("", 80)]);
        engine.update_record(&AddressRecord::Endpoints(record.clone()));
        record.subsets.clear();

        assert_eq!(
            addresses(&engine.recalculate()["default/simple"]),
            [vec![("10.0.0.1".to_string(), 80)]]
        );
    }
}
