// src/core/state/client.rs

//! The registry of connected clients, used for introspection and for drains.

use super::drain::DrainBarrier;
use crate::connection::SessionHandle;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A point-in-time view of one connected client.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub id: u64,
    pub addr: SocketAddr,
    pub created: Instant,
    pub last_command_time: Instant,
    /// Normalized name of the most recent command, if any.
    pub last_command: Option<String>,
    /// Invocation count per normalized command name.
    pub commands: HashMap<String, u64>,
}

impl ClientInfo {
    pub fn new(id: u64, addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id,
            addr,
            created: now,
            last_command_time: now,
            last_command: None,
            commands: HashMap::new(),
        }
    }

    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }

    pub fn idle(&self) -> Duration {
        self.last_command_time.elapsed()
    }

    pub fn total_commands(&self) -> u64 {
        self.commands.values().sum()
    }
}

impl fmt::Display for ClientInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} addr={} age={} idle={} cmd={}",
            self.id,
            self.addr,
            self.age().as_secs(),
            self.idle().as_secs(),
            self.last_command.as_deref().unwrap_or("NULL")
        )
    }
}

struct ClientEntry {
    info: ClientInfo,
    /// Cleared once a drain has closed the session.
    session: Option<SessionHandle>,
}

#[derive(Default)]
struct ClientTable {
    clients: HashMap<u64, ClientEntry>,
    drain: Option<Arc<DrainBarrier>>,
}

/// Tracks every registered session by id.
///
/// All operations take one short-lived lock that is never held across an
/// `.await`, and which is separate from the command registry's lock.
#[derive(Default)]
pub struct ClientRegistry {
    table: Mutex<ClientTable>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record for session `id`.
    pub fn register(&self, id: u64, addr: SocketAddr, session: SessionHandle) {
        let entry = ClientEntry {
            info: ClientInfo::new(id, addr),
            session: Some(session),
        };
        self.table.lock().clients.insert(id, entry);
    }

    /// Removes the record for `id` and signals an active drain.
    ///
    /// Returns false if `id` was not registered.
    pub fn deregister(&self, id: u64) -> bool {
        let mut table = self.table.lock();
        let removed = table.clients.remove(&id).is_some();
        if removed && let Some(barrier) = &table.drain {
            barrier.arrive(id);
        }
        removed
    }

    /// Counts an invocation of `name` by session `id`.
    pub fn record_command(&self, id: u64, name: &str) {
        let mut table = self.table.lock();
        if let Some(entry) = table.clients.get_mut(&id) {
            let info = &mut entry.info;
            info.last_command_time = Instant::now();
            match info.commands.get_mut(name) {
                Some(count) => *count += 1,
                None => {
                    info.commands.insert(name.to_string(), 1);
                }
            }
            if info.last_command.as_deref() != Some(name) {
                info.last_command = Some(name.to_string());
            }
        }
    }

    /// Snapshot of all registered clients, ordered by id.
    pub fn all(&self) -> Vec<ClientInfo> {
        let mut infos: Vec<ClientInfo> = self
            .table
            .lock()
            .clients
            .values()
            .map(|entry| entry.info.clone())
            .collect();
        infos.sort_unstable_by_key(|info| info.id);
        infos
    }

    pub fn get(&self, id: u64) -> Option<ClientInfo> {
        self.table
            .lock()
            .clients
            .get(&id)
            .map(|entry| entry.info.clone())
    }

    pub fn len(&self) -> usize {
        self.table.lock().clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().clients.is_empty()
    }

    /// Installs a barrier over the current clients and detaches their handles.
    ///
    /// Snapshot and installation happen under one lock, so every id in the
    /// barrier is guaranteed to arrive through `deregister` exactly once.
    pub(crate) fn begin_drain(&self) -> (Arc<DrainBarrier>, Vec<SessionHandle>) {
        let mut table = self.table.lock();
        let barrier = Arc::new(DrainBarrier::new(table.clients.keys().copied()));
        let sessions = table
            .clients
            .values_mut()
            .filter_map(|entry| entry.session.take())
            .collect();
        table.drain = Some(barrier.clone());
        (barrier, sessions)
    }

    /// Removes `barrier` if it is still the active one.
    pub(crate) fn end_drain(&self, barrier: &Arc<DrainBarrier>) {
        let mut table = self.table.lock();
        if table
            .drain
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(active, barrier))
        {
            table.drain = None;
        }
    }
}
