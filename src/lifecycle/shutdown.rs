//! Shutdown coordination for the gate.
//!
//! Two tasks listen: the HTTP server stops accepting and drains in-flight
//! requests, and the rate limit janitor exits its sweep loop. The signal task
//! in `main` is the only trigger.

use tokio::sync::broadcast;

/// One-shot broadcast shared by the server loop and the janitor.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver for the server; the server resubscribes one for the janitor.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every listener. Returns how many were still listening.
    pub fn trigger(&self) -> usize {
        let listening = self.tx.send(()).unwrap_or(0);
        tracing::info!(listening, "Shutdown triggered");
        listening
    }

    /// Listeners still running (server, janitor).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
