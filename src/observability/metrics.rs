//! Metrics registry for reviewdb
//!
//! - Counters only, plus the current instance and edge totals
//! - Monotonic increase for counters
//! - Reset only on process start
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics registry containing all operational counters
///
/// All counters use atomic operations with Relaxed ordering.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Committed transactions
    commits: AtomicU64,
    /// Rejected transactions
    rejections: AtomicU64,
    /// Instances created
    creates: AtomicU64,
    /// Instance updates
    updates: AtomicU64,
    /// Instances deleted, cascades included
    deletes: AtomicU64,
    /// Edges added
    links: AtomicU64,
    /// Edges removed, detaches included
    unlinks: AtomicU64,
    /// Live instances (current)
    instances: AtomicU64,
    /// Live edges (current)
    edges: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_commits(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejections(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_creates(&self) {
        self.creates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updates(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_links(&self) {
        self.links.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unlinks(&self) {
        self.unlinks.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the live totals after a commit
    pub fn set_totals(&self, instances: u64, edges: u64) {
        self.instances.store(instances, Ordering::Relaxed);
        self.edges.store(edges, Ordering::Relaxed);
    }

    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    pub fn rejections(&self) -> u64 {
        self.rejections.load(Ordering::Relaxed)
    }

    /// Get current snapshot of all metrics as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commits: self.commits.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            creates: self.creates.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            links: self.links.load(Ordering::Relaxed),
            unlinks: self.unlinks.load(Ordering::Relaxed),
            instances: self.instances.load(Ordering::Relaxed),
            edges: self.edges.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub commits: u64,
    pub rejections: u64,
    pub creates: u64,
    pub updates: u64,
    pub deletes: u64,
    pub links: u64,
    pub unlinks: u64,
    pub instances: u64,
    pub edges: u64,
}
