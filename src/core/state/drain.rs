// src/core/state/drain.rs

//! A counting barrier over a fixed set of session ids.

use parking_lot::Mutex;
use std::collections::HashSet;
use tokio::sync::watch;

/// Blocks a drain until every session in its snapshot has deregistered.
///
/// The barrier counts ids rather than arrivals, so a session outside the
/// snapshot deregistering, or a snapshot session arriving twice, cannot
/// release the waiter early.
#[derive(Debug)]
pub struct DrainBarrier {
    pending: Mutex<HashSet<u64>>,
    remaining: watch::Sender<usize>,
}

impl DrainBarrier {
    pub fn new(ids: impl IntoIterator<Item = u64>) -> Self {
        let pending: HashSet<u64> = ids.into_iter().collect();
        let (remaining, _) = watch::channel(pending.len());
        Self {
            pending: Mutex::new(pending),
            remaining,
        }
    }

    /// Records that session `id` has deregistered.
    pub fn arrive(&self, id: u64) {
        let mut pending = self.pending.lock();
        if pending.remove(&id) {
            let left = pending.len();
            self.remaining.send_replace(left);
        }
    }

    /// Number of sessions still expected.
    pub fn remaining(&self) -> usize {
        *self.remaining.borrow()
    }

    /// Resolves once every session in the snapshot has arrived.
    pub async fn wait(&self) {
        let mut rx = self.remaining.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|left| *left == 0).await;
    }
}
