// src/core/state/stats.rs

//! Server-wide counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic counters describing the server since startup.
#[derive(Debug)]
pub struct ServerStats {
    started: Instant,
    /// Connections accepted since startup.
    total_connections: AtomicU64,
    /// Commands dispatched to a registered handler since startup.
    total_commands: AtomicU64,
    /// Connections force-closed by drains.
    total_released: AtomicU64,
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            total_connections: AtomicU64::new(0),
            total_commands: AtomicU64::new(0),
            total_released: AtomicU64::new(0),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn increment_total_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    pub fn increment_total_commands(&self) {
        self.total_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_total_commands(&self) -> u64 {
        self.total_commands.load(Ordering::Relaxed)
    }

    pub fn add_released(&self, n: u64) {
        self.total_released.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get_total_released(&self) -> u64 {
        self.total_released.load(Ordering::Relaxed)
    }
}
