//! Lock-free streaming counters.
//!
//! Worlds bump these with relaxed atomics while they hold their own lock;
//! the dashboard reads them at its own pace.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::{Duration, Instant};

use crate::mailbox::Outbound;

pub struct Metrics {
    // Monotonic counters, one per outbound kind
    chunk_loads: AtomicU64,
    chunk_unloads: AtomicU64,
    spawns: AtomicU64,
    despawns: AtomicU64,
    looks: AtomicU64,
    moves: AtomicU64,
    chunk_bytes: AtomicU64,
    dropped: AtomicU64,

    chunk_updates: AtomicU64,
    chunk_update_ns_sum: AtomicU64,

    // update_chunk latency histogram
    hist_under_100us: AtomicU64,
    hist_100us_1ms: AtomicU64,
    hist_1_10ms: AtomicU64,
    hist_10_100ms: AtomicU64,
    hist_over_100ms: AtomicU64,

    // Gauges
    players_connected: AtomicU64,

    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            chunk_loads: AtomicU64::new(0),
            chunk_unloads: AtomicU64::new(0),
            spawns: AtomicU64::new(0),
            despawns: AtomicU64::new(0),
            looks: AtomicU64::new(0),
            moves: AtomicU64::new(0),
            chunk_bytes: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            chunk_updates: AtomicU64::new(0),
            chunk_update_ns_sum: AtomicU64::new(0),
            hist_under_100us: AtomicU64::new(0),
            hist_100us_1ms: AtomicU64::new(0),
            hist_1_10ms: AtomicU64::new(0),
            hist_10_100ms: AtomicU64::new(0),
            hist_over_100ms: AtomicU64::new(0),
            players_connected: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn record_outbound(&self, event: &Outbound) {
        let counter = match event {
            Outbound::ChunkLoad(_) => &self.chunk_loads,
            Outbound::ChunkUnload(_) => &self.chunk_unloads,
            Outbound::Spawn(_) => &self.spawns,
            Outbound::Despawn(_) => &self.despawns,
            Outbound::Look(_) => &self.looks,
            Outbound::RelativeMove(_) => &self.moves,
        };
        counter.fetch_add(1, Relaxed);
    }

    pub fn record_chunk_bytes(&self, bytes: u64) {
        self.chunk_bytes.fetch_add(bytes, Relaxed);
    }

    /// An event addressed to a mailbox whose session had already gone.
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Relaxed);
    }

    /// Called after each `update_chunk` that actually re-centered a view.
    pub fn record_chunk_update(&self, duration: Duration) {
        self.chunk_updates.fetch_add(1, Relaxed);
        self.chunk_update_ns_sum
            .fetch_add(duration.as_nanos() as u64, Relaxed);

        let bucket = match duration.as_micros() {
            0..=99 => &self.hist_under_100us,
            100..=999 => &self.hist_100us_1ms,
            1_000..=9_999 => &self.hist_1_10ms,
            10_000..=99_999 => &self.hist_10_100ms,
            _ => &self.hist_over_100ms,
        };
        bucket.fetch_add(1, Relaxed);
    }

    pub fn player_joined(&self) {
        self.players_connected.fetch_add(1, Relaxed);
    }

    pub fn player_left(&self) {
        self.players_connected.fetch_sub(1, Relaxed);
    }

    /// Read all counters. `columns` is sampled by the caller from the worlds.
    pub fn snapshot(&self, columns: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs_f64(),
            players: self.players_connected.load(Relaxed),
            columns,
            chunk_loads: self.chunk_loads.load(Relaxed),
            chunk_unloads: self.chunk_unloads.load(Relaxed),
            spawns: self.spawns.load(Relaxed),
            despawns: self.despawns.load(Relaxed),
            looks: self.looks.load(Relaxed),
            moves: self.moves.load(Relaxed),
            chunk_bytes: self.chunk_bytes.load(Relaxed),
            dropped: self.dropped.load(Relaxed),
            chunk_updates: self.chunk_updates.load(Relaxed),
            chunk_update_ns_sum: self.chunk_update_ns_sum.load(Relaxed),
            hist: [
                self.hist_under_100us.load(Relaxed),
                self.hist_100us_1ms.load(Relaxed),
                self.hist_1_10ms.load(Relaxed),
                self.hist_10_100ms.load(Relaxed),
                self.hist_over_100ms.load(Relaxed),
            ],
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of every counter. Clients compute rates by diffing
/// consecutive snapshots.
#[derive(Clone, Debug, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: f64,
    pub players: u64,
    pub columns: u64,
    pub chunk_loads: u64,
    pub chunk_unloads: u64,
    pub spawns: u64,
    pub despawns: u64,
    pub looks: u64,
    pub moves: u64,
    pub chunk_bytes: u64,
    pub dropped: u64,
    pub chunk_updates: u64,
    pub chunk_update_ns_sum: u64,
    /// `[<100μs, 100μs-1ms, 1-10ms, 10-100ms, >100ms]`
    pub hist: [u64; 5],
}
