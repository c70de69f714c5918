//! Live web dashboard for streaming statistics.
//!
//! Counters are plain atomics updated by the worlds; the web server runs on
//! its own tasks and only takes world read locks to sample gauges.

pub mod metrics;
pub mod server;

use std::sync::Arc;

use crate::universe::Universe;

pub use metrics::{Metrics, MetricsSnapshot};

/// Shared via `Arc<DashboardState>` with the web server.
pub struct DashboardState {
    pub universe: Arc<Universe>,
}

impl DashboardState {
    pub fn new(universe: Arc<Universe>) -> Self {
        Self { universe }
    }

    pub fn metrics(&self) -> &Metrics {
        self.universe.metrics()
    }

    /// Current counters plus the live column count across all worlds.
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let columns = self.universe.column_count().await as u64;
        self.metrics().snapshot(columns)
    }
}
