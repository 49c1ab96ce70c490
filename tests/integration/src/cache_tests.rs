//! Serving store integration tests.

use std::sync::Arc;
use std::time::Duration;

use integration_tests::{load_assignment, route_config};
use nebucloud_ingress::prelude::*;

fn snapshot(version: &str) -> Snapshot {
    Snapshot::builder()
        .version(version)
        .resources(ResourceKind::Route, vec![route_config("ingress_http")])
        .build()
}

#[test]
fn snapshot_cache_multiple_nodes() {
    let cache = SnapshotCache::new();

    let nodes = ["node-1", "node-2", "node-3"];
    for (i, node_id) in nodes.iter().enumerate() {
        cache
            .set_snapshot(NodeHash::from_id(node_id), snapshot(&format!("v{}", i + 1)))
            .unwrap();
    }
    assert_eq!(cache.snapshot_count(), 3);

    for (i, node_id) in nodes.iter().enumerate() {
        let snapshot = cache.get_snapshot(NodeHash::from_id(node_id)).unwrap();
        assert_eq!(snapshot.version().as_str(), format!("v{}", i + 1));
    }

    cache.clear_snapshot(NodeHash::from_id("node-1"));
    assert!(!cache.has_snapshot(NodeHash::from_id("node-1")));
}

#[test]
fn fetch_skips_current_version() {
    let cache = SnapshotCache::new();
    let node = NodeHash::from_id("contour");
    cache.set_snapshot(node, snapshot("v1")).unwrap();

    let first = cache.fetch(&Request::new(node, ResourceKind::Route)).unwrap();
    assert_eq!(first.version.as_str(), "v1");
    assert_eq!(first.names(), ["ingress_http"]);

    let again = Request::new(node, ResourceKind::Route).with_version("v1");
    assert!(cache.fetch(&again).is_none());

    assert_eq!(cache.stats().fetch_hits(), 1);
    assert_eq!(cache.stats().fetch_misses(), 1);
    assert!((cache.stats().hit_rate() - 0.5).abs() < 0.01);
}

#[tokio::test]
async fn snapshot_watch_notifications() {
    let cache = SnapshotCache::new();
    let node = NodeHash::from_id("contour");

    let mut first = cache.create_watch(node, ResourceKind::Route);
    let mut second = cache.create_watch(node, ResourceKind::Route);
    assert_eq!(cache.watches().watch_count(node, ResourceKind::Route), 2);

    cache.set_snapshot(node, snapshot("v1")).unwrap();

    for watch in [&mut first, &mut second] {
        let update = tokio::time::timeout(Duration::from_secs(1), watch.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(update.kind, ResourceKind::Route);
        assert_eq!(update.version.as_str(), "v1");
    }

    assert!(cache.cancel_watch(first.id()));
    assert_eq!(cache.watches().watch_count(node, ResourceKind::Route), 1);
}

#[test]
fn linear_cache_tracks_per_resource_versions() {
    let cache = LinearCache::new(ResourceKind::Endpoint);
    cache
        .set_resources([
            load_assignment("default/a", &["10.0.0.1"]),
            load_assignment("default/b", &["10.0.0.2"]),
        ])
        .unwrap();
    let b_version = cache.resource_version("default/b").unwrap();
    let kind_version = cache.version();

    let changed = cache
        .set_resources([
            load_assignment("default/a", &["10.0.0.3"]),
            load_assignment("default/b", &["10.0.0.2"]),
        ])
        .unwrap();
    assert_eq!(changed, 1);
    assert_eq!(cache.resource_version("default/b").unwrap(), b_version);
    assert_ne!(cache.version(), kind_version);

    // Nothing moved, so the kind version holds.
    let unchanged = cache.version();
    cache
        .set_resources([
            load_assignment("default/a", &["10.0.0.3"]),
            load_assignment("default/b", &["10.0.0.2"]),
        ])
        .unwrap();
    assert_eq!(cache.version(), unchanged);
}

#[test]
fn mux_routes_by_kind() {
    let node = NodeHash::from_id("contour");
    let snapshots = Arc::new(SnapshotCache::new());
    let endpoints = Arc::new(LinearCache::new(ResourceKind::Endpoint));

    let mux = MuxCache::builder()
        .route(ResourceKind::Route, snapshots.clone())
        .route(ResourceKind::Endpoint, endpoints.clone())
        .build();

    snapshots.set_snapshot(node, snapshot("v1")).unwrap();
    endpoints
        .update_resource(load_assignment("default/a", &["10.0.0.1"]))
        .unwrap();

    let routes = mux.fetch(&Request::new(node, ResourceKind::Route)).unwrap();
    assert_eq!(routes.names(), ["ingress_http"]);
    let clas = mux
        .fetch(&Request::new(node, ResourceKind::Endpoint))
        .unwrap();
    assert_eq!(clas.names(), ["default/a"]);

    assert!(mux.fetch(&Request::new(node, ResourceKind::Secret)).is_none());
}

#[test]
fn snapshot_cache_concurrent_access() {
    use std::thread;

    let cache = Arc::new(SnapshotCache::new());
    let mut handles = vec![];

    for i in 0..10 {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            let node = NodeHash::from_id(&format!("node-{i}"));
            for j in 0..100 {
                cache.set_snapshot(node, snapshot(&format!("v{j}"))).unwrap();
                cache.get_snapshot(node);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.snapshot_count(), 10);
    assert_eq!(cache.stats().updates_accepted(), 1000);
}
