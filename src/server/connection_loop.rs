// src/server/connection_loop.rs

//! Contains the accept loop and per-connection task spawning.

use crate::connection::ConnectionHandler;
use crate::core::ServeError;
use crate::core::state::ServerState;
use socket2::{SockRef, TcpKeepalive};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{Instrument, debug, error, info_span, warn};

/// Accepts connections until `accept` fails, spawning one task per connection.
pub(super) async fn run(state: Arc<ServerState>, listener: TcpListener) -> Result<(), ServeError> {
    loop {
        match listener.accept().await {
            Ok((socket, addr)) => spawn_connection(&state, socket, addr),
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                return Err(e.into());
            }
        }
    }
}

/// Registers the connection and hands it to its own task.
///
/// Registration happens here rather than inside the task, so a client is
/// visible to introspection and drains as soon as `accept` returns it.
fn spawn_connection(state: &Arc<ServerState>, socket: TcpStream, addr: SocketAddr) {
    state.stats.increment_total_connections();
    if let Err(e) = configure_socket(&socket, state.config.keepalive()) {
        warn!("Failed to configure socket for {}: {}", addr, e);
    }

    let session_id = state.next_session_id();
    debug!("Accepted connection {} from {}", session_id, addr);

    let (read_half, write_half) = socket.into_split();
    let handler = ConnectionHandler::new(read_half, write_half, addr, state.clone(), session_id);
    let span = info_span!("session", id = session_id, %addr);
    tokio::spawn(handler.run().instrument(span));
}

/// Applies `TCP_NODELAY` and, if `keepalive` is set, TCP keep-alive using
/// that period both as the idle time and as the probe interval.
pub fn configure_socket(socket: &TcpStream, keepalive: Option<Duration>) -> io::Result<()> {
    socket.set_nodelay(true)?;
    if let Some(period) = keepalive {
        let params = TcpKeepalive::new().with_time(period).with_interval(period);
        SockRef::from(socket).set_tcp_keepalive(&params)?;
    }
    Ok(())
}
