// src/server/release.rs

//! Graceful drain of every connected client.

use super::Server;
use tracing::info;

impl Server {
    /// Closes every currently registered connection and waits until each of
    /// them has deregistered.
    ///
    /// Clients that connect while a drain is running are not part of its
    /// snapshot and stay open. Concurrent calls run one after another.
    pub async fn release(&self) {
        let _drain = self.state.drain_lock.lock().await;

        let (barrier, sessions) = self.state.clients.begin_drain();
        let count = barrier.remaining();
        if count > 0 {
            info!("Draining {} client connection(s).", count);
        }

        for session in &sessions {
            session.close();
        }
        drop(sessions);

        barrier.wait().await;
        self.state.clients.end_drain(&barrier);
        self.state.stats.add_released(count as u64);

        if count > 0 {
            info!("All {} drained connection(s) closed.", count);
        }
    }
}
