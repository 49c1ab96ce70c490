//! Metrics for the controller.
//!
//! Recorded through the `metrics` facade; installing an exporter is left to
//! the binary.

use metrics::{counter, gauge};

/// Metrics recorded by the caches and the coordinator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerMetrics;

impl ControllerMetrics {
    /// A snapshot was published. `scope` is `all` or `endpoints`.
    pub fn snapshot_published(&self, scope: &'static str) {
        counter!("xds_snapshots_published_total", "scope" => scope).increment(1);
    }

    /// The store refused a snapshot.
    pub fn publish_error(&self) {
        counter!("xds_snapshot_publish_errors_total").increment(1);
    }

    /// A recalculation drained `drained` stale entries. Nothing is stale
    /// afterwards.
    pub fn recalculated(&self, drained: usize) {
        counter!("xds_endpoint_recalculations_total").increment(1);
        counter!("xds_stale_clusters_drained_total").increment(drained as u64);
        gauge!("xds_stale_clusters").set(0.0);
    }

    /// Clusters were marked stale.
    pub fn stale_clusters(&self, pending: usize) {
        gauge!("xds_stale_clusters").set(pending as f64);
    }

    /// A service cluster failed validation.
    pub fn invalid_cluster(&self) {
        counter!("xds_invalid_clusters_total").increment(1);
    }

    /// An address change had no observable effect.
    pub fn refresh_suppressed(&self) {
        counter!("xds_endpoint_refresh_suppressed_total").increment(1);
    }
}
