// src/core/state/core.rs

//! Defines the central `ServerState` struct, holding all shared server-wide state.

use super::client::ClientRegistry;
use super::stats::ServerStats;
use crate::config::Config;
use crate::core::handler::CommandRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// The state shared by the accept loop, every connection task and every drain.
///
/// It is wrapped in an `Arc` once at construction. The two registries carry
/// their own independent locks; nothing else in here is mutable except the
/// atomics.
pub struct ServerState {
    /// Immutable after construction.
    pub config: Config,
    pub commands: CommandRegistry,
    pub clients: ClientRegistry,
    pub stats: ServerStats,
    /// Source of session ids; starts at 1 and never wraps in practice.
    session_id_counter: AtomicU64,
    /// Serializes drains so barriers never overlap.
    pub(crate) drain_lock: Mutex<()>,
}

impl ServerState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            commands: CommandRegistry::new(),
            clients: ClientRegistry::new(),
            stats: ServerStats::new(),
            session_id_counter: AtomicU64::new(0),
            drain_lock: Mutex::new(()),
        }
    }

    /// Allocates a fresh, never reused session id.
    pub fn next_session_id(&self) -> u64 {
        self.session_id_counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}
