// src/connection/handler.rs

//! Defines the `ConnectionHandler` which manages the full lifecycle of a client connection.

use super::dispatch::run_pipeline;
use super::guard::ConnectionGuard;
use super::session::SessionHandle;
use crate::core::ServeError;
use crate::core::protocol::{RequestReader, ResponseWriter};
use crate::core::state::ServerState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Owns one connection and runs its request/response loop.
pub struct ConnectionHandler {
    reader: RequestReader,
    writer: ResponseWriter,
    addr: SocketAddr,
    state: Arc<ServerState>,
    kill_rx: broadcast::Receiver<()>,
    closed: bool,
    // Dropped last: deregistration happens after the transport is released.
    guard: ConnectionGuard,
}

impl ConnectionHandler {
    /// Wraps the two halves of a connection and registers the session.
    pub fn new<R, W>(
        reader: R,
        writer: W,
        addr: SocketAddr,
        state: Arc<ServerState>,
        session_id: u64,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (handle, kill_rx) = SessionHandle::new();
        let guard = ConnectionGuard::register(state.clone(), session_id, addr, handle);
        Self {
            reader: RequestReader::new(reader),
            writer: ResponseWriter::new(writer),
            addr,
            state,
            kill_rx,
            closed: false,
            guard,
        }
    }

    pub fn session_id(&self) -> u64 {
        self.guard.session_id()
    }

    /// Serves the connection until the peer leaves, an error ends it, or it is
    /// closed from outside. Consumes the handler, which deregisters the session.
    pub async fn run(mut self) {
        let session_id = self.session_id();
        debug!("Session {} started for {}", session_id, self.addr);

        while !self.closed {
            let deadline = self
                .state
                .config
                .command_timeout()
                .map(|timeout| Instant::now() + timeout);
            self.reader.set_deadline(deadline);
            self.writer.set_deadline(deadline);

            let outcome = tokio::select! {
                biased;
                _ = self.kill_rx.recv() => Err(ServeError::ConnectionClosed),
                res = run_pipeline(&self.state, session_id, &mut self.reader, &mut self.writer) => res,
            };

            match outcome {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Connection from {} closed by peer.", self.addr);
                    self.closed = true;
                }
                Err(e) if e.is_fatal() => {
                    self.log_termination(&e);
                    return;
                }
                // The only recoverable failure: the stream is no longer framed,
                // but the transport can still carry the error reply.
                Err(e) => {
                    warn!("Closing connection from {}: {}", self.addr, e);
                    self.writer.append_error(&format!("ERR {e}"));
                    self.closed = true;
                }
            }

            if let Err(e) = self.flush().await {
                self.log_termination(&e);
                return;
            }
        }
    }

    /// Flushes pending replies unless the session is closed meanwhile.
    async fn flush(&mut self) -> Result<(), ServeError> {
        tokio::select! {
            biased;
            _ = self.kill_rx.recv() => Err(ServeError::ConnectionClosed),
            res = self.writer.flush() => res,
        }
    }

    fn log_termination(&self, e: &ServeError) {
        match e {
            ServeError::Timeout => debug!("Connection from {} timed out.", self.addr),
            ServeError::ConnectionClosed => {
                debug!("Connection from {} closed by the server.", self.addr)
            }
            e if e.is_normal_disconnect() => {
                debug!("Connection from {} closed by peer: {}", self.addr, e)
            }
            e => warn!("Connection error for {}: {}", self.addr, e),
        }
    }
}
