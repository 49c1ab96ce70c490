//! Snapshot integration tests.

use integration_tests::{load_assignment, route_config};
use nebucloud_ingress::prelude::*;

#[test]
fn snapshot_builder_basic() {
    let snapshot = Snapshot::builder().version("v1").build();

    assert_eq!(snapshot.version().as_str(), "v1");
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.total_resources(), 0);
}

#[test]
fn snapshot_kinds_inherit_version() {
    let snapshot = Snapshot::builder()
        .version("global-v1")
        .resources(ResourceKind::Route, vec![route_config("ingress_http")])
        .resources(ResourceKind::Endpoint, vec![load_assignment("default/a", &["10.0.0.1"])])
        .build();

    assert!(snapshot.contains_kind(ResourceKind::Route));
    assert!(!snapshot.contains_kind(ResourceKind::Listener));
    assert_eq!(
        snapshot.get_version(ResourceKind::Route).map(ResourceVersion::as_str),
        Some("global-v1")
    );
    assert_eq!(snapshot.get_version(ResourceKind::Listener), None);
    assert_eq!(snapshot.kinds().count(), 2);
}

#[test]
fn snapshot_resources_are_name_ordered() {
    let snapshot = Snapshot::builder()
        .version("v1")
        .resources(
            ResourceKind::Route,
            vec![route_config("z"), route_config("a"), route_config("m")],
        )
        .build();

    let routes = snapshot.get_resources(ResourceKind::Route).unwrap();
    assert_eq!(routes.names().collect::<Vec<_>>(), ["a", "m", "z"]);

    let selected = routes.select(&["z".to_string(), "missing".to_string(), "a".to_string()]);
    let names: Vec<_> = selected.iter().map(|r| r.name()).collect();
    assert_eq!(names, ["a", "z"]);
}

#[test]
fn misfiled_resources_are_rejected() {
    let cache = SnapshotCache::new();
    let node = NodeHash::from_id("contour");

    let good = Snapshot::builder()
        .version("v1")
        .resources(ResourceKind::Route, vec![route_config("ingress_http")])
        .build();
    cache.set_snapshot(node, good).unwrap();

    let misfiled = Snapshot::builder()
        .version("v2")
        .resources(ResourceKind::Route, vec![load_assignment("default/a", &[])])
        .build();
    let err = cache.set_snapshot(node, misfiled).unwrap_err();
    assert!(matches!(err, XdsError::SnapshotRejected { .. }));

    assert_eq!(cache.get_snapshot(node).unwrap().version().as_str(), "v1");
    assert_eq!(cache.stats().updates_rejected(), 1);
}

#[test]
fn duplicate_and_unnamed_resources_are_rejected() {
    let duplicated = Snapshot::builder()
        .version("v1")
        .resources(
            ResourceKind::Route,
            vec![route_config("ingress_http"), route_config("ingress_http")],
        )
        .build();
    assert!(duplicated.validate().is_err());

    let unnamed = Snapshot::builder()
        .version("v1")
        .resources(ResourceKind::Route, vec![route_config("")])
        .build();
    assert!(unnamed.validate().is_err());
}
