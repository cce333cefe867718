//! Stop signalling for background tasks.

use tokio::sync::broadcast;

/// One-shot stop signal shared by a task's owner and the task.
///
/// Receivers obtained before [`Shutdown::trigger`] observe the signal even
/// if they are busy when it is sent.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber. Does not wait for them.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of subscribers still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_busy_subscriber() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 1);

        // Sent before the receiver polls.
        shutdown.trigger();
        assert!(rx.recv().await.is_ok());

        drop(rx);
        assert_eq!(shutdown.receiver_count(), 0);
    }
}
