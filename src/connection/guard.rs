// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard tying a session's registration to its lifetime.

use super::session::SessionHandle;
use crate::core::state::ServerState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Registers a session on creation and deregisters it on drop.
///
/// Dropping is the only way out of a connection task, whether the pipeline
/// loop returned, the task was aborted or a handler panicked, so the
/// registration is undone exactly once on every path.
pub struct ConnectionGuard {
    state: Arc<ServerState>,
    session_id: u64,
    addr: SocketAddr,
}

impl ConnectionGuard {
    pub(crate) fn register(
        state: Arc<ServerState>,
        session_id: u64,
        addr: SocketAddr,
        handle: SessionHandle,
    ) -> Self {
        state.clients.register(session_id, addr, handle);
        Self {
            state,
            session_id,
            addr,
        }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if !self.state.clients.deregister(self.session_id) {
            debug!(
                "Session {} ({}) was already gone from the client registry.",
                self.session_id, self.addr
            );
        }
    }
}
