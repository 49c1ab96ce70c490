//! End-to-end tests: graph and address events in, served resources out.

use std::sync::Arc;
use std::time::Duration;

use integration_tests::{endpoints, hosts, http_dag};
use nebucloud_ingress::prelude::*;

fn coordinator(mode: CacheMode) -> Arc<SnapshotCoordinator> {
    SnapshotCoordinator::new(ControllerConfig {
        cache_mode: mode,
        ..ControllerConfig::default()
    })
    .unwrap()
}

fn fetch(coordinator: &SnapshotCoordinator, kind: ResourceKind) -> Vec<BoxResource> {
    coordinator
        .cache()
        .fetch(&Request::new(coordinator.node(), kind))
        .map(|r| r.resources)
        .unwrap_or_default()
}

fn served_hosts(coordinator: &SnapshotCoordinator, cluster: &str) -> Vec<(String, u32)> {
    fetch(coordinator, ResourceKind::Endpoint)
        .iter()
        .find(|r| r.name() == cluster)
        .map(hosts)
        .unwrap_or_default()
}

#[test]
fn add_then_delete_in_both_modes() {
    for mode in [CacheMode::Shared, CacheMode::Split] {
        let coordinator = coordinator(mode);
        coordinator.on_change(&http_dag(&["simple"]));
        assert!(served_hosts(&coordinator, "default/simple").is_empty());

        let record = endpoints("simple", &["192.168.183.24"]);
        coordinator.endpoints().on_add(record.clone().into());
        assert_eq!(
            served_hosts(&coordinator, "default/simple"),
            [("192.168.183.24".to_string(), 8080)]
        );

        coordinator.endpoints().on_delete(record.into());
        let names: Vec<_> = fetch(&coordinator, ResourceKind::Endpoint)
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, ["default/simple"]);
        assert!(served_hosts(&coordinator, "default/simple").is_empty());
    }
}

#[test]
fn endpoint_slices_merge_per_service() {
    let coordinator = coordinator(CacheMode::Split);
    coordinator.on_change(&http_dag(&["simple"]));

    let service = ServiceName::new("default", "simple");
    let ports = vec![EndpointPort::tcp("", 8080)];
    coordinator.endpoints().on_add(
        EndpointSlice::new(&service, "simple-abc")
            .with_endpoint("10.0.0.2", Some(true))
            .with_endpoint("10.0.0.9", Some(false))
            .with_ports(ports.clone())
            .into(),
    );
    coordinator.endpoints().on_add(
        EndpointSlice::new(&service, "simple-def")
            .with_endpoint("10.0.0.1", None)
            .with_ports(ports)
            .into(),
    );

    assert_eq!(
        served_hosts(&coordinator, "default/simple"),
        [
            ("10.0.0.1".to_string(), 8080),
            ("10.0.0.2".to_string(), 8080)
        ]
    );
}

#[test]
fn graph_rebuild_is_idempotent() {
    let coordinator = coordinator(CacheMode::Split);
    let dag = http_dag(&["a", "b"]);
    coordinator.endpoints().on_add(endpoints("a", &["10.0.0.1"]).into());

    coordinator.on_change(&dag);
    let first: Vec<_> = fetch(&coordinator, ResourceKind::Cluster)
        .iter()
        .map(|r| Resource::encode(r.as_ref()))
        .collect();
    let endpoint_version = coordinator.linear().unwrap().version();

    coordinator.on_change(&dag);
    let second: Vec<_> = fetch(&coordinator, ResourceKind::Cluster)
        .iter()
        .map(|r| Resource::encode(r.as_ref()))
        .collect();

    assert_eq!(first, second);
    assert_eq!(coordinator.linear().unwrap().version(), endpoint_version);
    assert_eq!(
        served_hosts(&coordinator, "default/a"),
        [("10.0.0.1".to_string(), 8080)]
    );
}

#[test]
fn removed_clusters_disappear() {
    let coordinator = coordinator(CacheMode::Split);
    coordinator.on_change(&http_dag(&["a", "b"]));
    assert_eq!(fetch(&coordinator, ResourceKind::Endpoint).len(), 2);

    coordinator.on_change(&http_dag(&["a"]));
    let names: Vec<_> = fetch(&coordinator, ResourceKind::Endpoint)
        .iter()
        .map(|r| r.name().to_string())
        .collect();
    assert_eq!(names, ["default/a"]);
}

#[tokio::test]
async fn split_mode_streams_only_endpoint_changes() {
    let coordinator = coordinator(CacheMode::Split);
    coordinator.on_change(&http_dag(&["simple"]));

    let cache = coordinator.cache();
    let mut listeners = cache.create_watch(coordinator.node(), ResourceKind::Listener);
    let mut clas = cache.create_watch(coordinator.node(), ResourceKind::Endpoint);

    coordinator
        .endpoints()
        .on_add(endpoints("simple", &["10.0.0.1"]).into());

    let update = tokio::time::timeout(Duration::from_secs(1), clas.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.kind, ResourceKind::Endpoint);
    assert!(listeners.try_recv().is_err());

    // A resync with an identical record is not a change.
    let record = endpoints("simple", &["10.0.0.1"]);
    coordinator
        .endpoints()
        .on_update(record.clone().into(), record.into());
    assert!(clas.try_recv().is_err());

    coordinator.on_change(&http_dag(&["simple", "other"]));
    let update = tokio::time::timeout(Duration::from_secs(1), listeners.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.kind, ResourceKind::Listener);
}

#[test]
fn config_from_json() {
    let config = ControllerConfig::from_json(
        r#"{
            "node_id": "edge",
            "cache_mode": "shared",
            "stats_listener": null
        }"#,
    )
    .unwrap();
    let coordinator = SnapshotCoordinator::new(config).unwrap();
    assert_eq!(coordinator.mode(), CacheMode::Shared);
    assert_eq!(coordinator.node(), NodeHash::from_id("edge"));

    coordinator.on_change(&Dag::default());
    assert!(fetch(&coordinator, ResourceKind::Listener).is_empty());

    let invalid = ControllerConfig::from_json(r#"{ "node_id": "" }"#);
    assert!(matches!(invalid, Err(XdsError::Configuration(_))));
}
