//! Connection and stream counters
//!
//! An explicit counter object shared by reference; callers clone the `Arc`
//! into each connection. All updates are atomic fetch-adds.

use std::sync::atomic::{AtomicU64, Ordering};

/// Engine counters
#[derive(Debug, Default)]
pub struct Metrics {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    total_streams: AtomicU64,
    active_streams: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub total_connections: u64,
    pub active_connections: u64,
    pub total_streams: u64,
    pub active_streams: u64,
}

impl Metrics {
    /// Create a zeroed counter set
    pub fn new() -> Self {
        Metrics::default()
    }

    /// Count a connection entering service
    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a connection leaving service
    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Count a stream opening
    pub fn stream_opened(&self) {
        self.total_streams.fetch_add(1, Ordering::Relaxed);
        self.active_streams.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a stream closing
    pub fn stream_closed(&self) {
        self.active_streams.fetch_sub(1, Ordering::Relaxed);
    }

    /// Emit the current counters to the log
    pub fn log(&self) {
        let s = self.snapshot();
        tracing::info!(
            total_connections = s.total_connections,
            active_connections = s.active_connections,
            total_streams = s.total_streams,
            active_streams = s.active_streams,
            "h2 metrics"
        );
    }

    /// Read all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            total_streams: self.total_streams.load(Ordering::Relaxed),
            active_streams: self.active_streams.load(Ordering::Relaxed),
        }
    }
}
