// src/connection/session.rs

//! The out-of-band handle through which a live session can be closed.

use tokio::sync::broadcast;

/// A cloneable handle that can force a running session to close.
///
/// The session holds the receiving end and treats any message, or the loss of
/// every sender, as a close request.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    kill_tx: broadcast::Sender<()>,
}

impl SessionHandle {
    /// Creates a handle together with the receiver the session listens on.
    pub fn new() -> (Self, broadcast::Receiver<()>) {
        let (kill_tx, kill_rx) = broadcast::channel(1);
        (Self { kill_tx }, kill_rx)
    }

    /// Asks the session to close its connection. Idempotent.
    pub fn close(&self) {
        // An error only means the session has already gone away.
        let _ = self.kill_tx.send(());
    }
}
