// announcer-core/src/shutdown.rs

//! Broadcast shutdown signal shared by the announcer's background loops.
//!
//! The signal is level-triggered: once fired, every current and future
//! listener observes it as fired. Firing is idempotent.

use tokio::sync::watch;

/// Owner side of the shutdown signal.
#[derive(Debug)]
pub struct ShutdownSignal {
    sender: watch::Sender<bool>,
}

/// Observer side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Fires the signal.
    ///
    /// Returns `true` if this call fired it and `false` if it had already
    /// been fired.
    pub fn trigger(&self) -> bool {
        self.sender.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        })
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Creates a new listener.
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    /// Waits until the signal fires.
    ///
    /// Resolves immediately if it already fired, or if the owning
    /// `ShutdownSignal` was dropped.
    pub async fn fired(&mut self) {
        // An Err means the sender is gone, nobody can fire anymore.
        let _ = self.receiver.wait_for(|fired| *fired).await;
    }

    pub fn is_fired(&self) -> bool {
        *self.receiver.borrow()
    }
}
