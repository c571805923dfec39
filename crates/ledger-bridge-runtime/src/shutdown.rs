// crates/ledger-bridge-runtime/src/shutdown.rs
// ============================================================================
// Module: Shutdown Signal
// Description: Cooperative stop flag shared by worker loops.
// Purpose: Let workers finish their in-flight unit and exit cleanly.
// Dependencies: tokio
// ============================================================================

//! Cooperative shutdown built on a `watch` channel.

use std::time::Duration;

use tokio::sync::watch;

/// Sender side of the shutdown flag.
#[derive(Debug)]
pub struct ShutdownSignal {
    /// Flag channel; `true` once shutdown was requested.
    sender: watch::Sender<bool>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender,
        }
    }

    /// Returns a listener for a worker.
    #[must_use]
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    /// Requests shutdown. Idempotent.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver side of the shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    /// Flag channel.
    receiver: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Returns true once shutdown was requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Sleeps for `duration` unless shutdown arrives first.
    ///
    /// Returns true when shutdown was requested or the signal was dropped.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        let mut receiver = self.receiver.clone();
        let stopped = tokio::select! {
            () = tokio::time::sleep(duration) => false,
            _ = receiver.wait_for(|stop| *stop) => true,
        };
        stopped || self.is_triggered()
    }
}
