//! Load tests for the endpoint path with 1000 clusters.
//!
//! These tests verify the controller under concurrent event sources:
//! - Address events for many services from parallel tasks
//! - Graph rebuilds racing with address events
//!
//! Run with: `cargo test --package integration-tests --test load_tests -- --nocapture`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use integration_tests::{endpoints, hosts, http_dag};
use nebucloud_ingress::prelude::*;
use tokio::sync::Barrier;

fn services(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("svc-{i}")).collect()
}

fn dag_for(names: &[String]) -> Dag {
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    http_dag(&names)
}

fn address(service: usize, generation: usize) -> String {
    format!("10.{}.{}.{}", service / 250, service % 250, generation % 250)
}

/// Every service gets its final record from one of several parallel tasks.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_address_events_1000_clusters() {
    let coordinator = SnapshotCoordinator::new(ControllerConfig::default()).unwrap();
    let names = services(1000);
    coordinator.on_change(&dag_for(&names));

    let num_tasks = 10;
    let per_task = names.len() / num_tasks;
    let generations = 3;
    let barrier = Arc::new(Barrier::new(num_tasks));
    let total_ops = Arc::new(AtomicU64::new(0));

    let start = Instant::now();
    let mut handles = Vec::new();
    for task_id in 0..num_tasks {
        let coordinator = Arc::clone(&coordinator);
        let barrier = Arc::clone(&barrier);
        let total_ops = Arc::clone(&total_ops);
        let names = names.clone();

        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            for i in task_id * per_task..(task_id + 1) * per_task {
                for generation in 0..generations {
                    let addr = address(i, generation);
                    coordinator
                        .endpoints()
                        .on_add(endpoints(&names[i], &[addr.as_str()]).into());
                    total_ops.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }

    for handle in handles {
        handle.await.expect("Task panicked");
    }

    let duration = start.elapsed();
    let ops = total_ops.load(Ordering::Relaxed);
    println!(
        "Concurrent address events: {} ops in {:?} ({:.2} µs/op)",
        ops,
        duration,
        duration.as_micros() as f64 / ops as f64
    );

    let linear = coordinator.linear().unwrap();
    assert_eq!(linear.len(), names.len());
    for (i, name) in names.iter().enumerate() {
        let cla = linear.get_resource(&format!("default/{name}")).unwrap();
        assert_eq!(hosts(&cla), [(address(i, generations - 1), 8080)]);
    }
    assert_eq!(coordinator.endpoints().engine().stale_count(), 0);
}

/// Graph rebuilds and address events interleave; the last state wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rebuilds_racing_address_events() {
    let coordinator = SnapshotCoordinator::new(ControllerConfig::default()).unwrap();
    let names = services(200);
    let barrier = Arc::new(Barrier::new(2));

    let rebuilder = {
        let coordinator = Arc::clone(&coordinator);
        let barrier = Arc::clone(&barrier);
        let names = names.clone();
        tokio::spawn(async move {
            barrier.wait().await;
            for round in 1..=names.len() / 20 {
                coordinator.on_change(&dag_for(&names[..round * 20]));
            }
        })
    };

    let watcher = {
        let coordinator = Arc::clone(&coordinator);
        let barrier = Arc::clone(&barrier);
        let names = names.clone();
        tokio::spawn(async move {
            barrier.wait().await;
            for (i, name) in names.iter().enumerate() {
                let addr = address(i, 0);
                coordinator
                    .endpoints()
                    .on_add(endpoints(name, &[addr.as_str()]).into());
            }
        })
    };

    rebuilder.await.expect("Task panicked");
    watcher.await.expect("Task panicked");

    let linear = coordinator.linear().unwrap();
    assert_eq!(linear.len(), names.len());
    for (i, name) in names.iter().enumerate() {
        let cla = linear.get_resource(&format!("default/{name}")).unwrap();
        assert_eq!(hosts(&cla), [(address(i, 0), 8080)]);
    }

    let snapshot = coordinator.snapshots().get_snapshot(coordinator.node()).unwrap();
    let clusters = snapshot.get_resources(ResourceKind::Cluster).unwrap();
    assert_eq!(clusters.len(), names.len());
}
