//! Device readiness mailbox
//!
//! A single-slot mailbox between the transport and the resync worker.
//! `notify()` never blocks: if a signal is already pending the new one is
//! dropped, so any burst of (re)connect events collapses into one replay.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::trace;

/// Create a connected signal / mailbox pair
pub fn readiness_channel() -> (ReadinessSignal, ReadinessMailbox) {
    // Depth one is the whole debounce
    let (tx, rx) = mpsc::channel(1);
    (ReadinessSignal { tx }, ReadinessMailbox { rx })
}

/// Producer side, held by the transport
///
/// Cheap to clone and usable from any thread, including threads that are
/// not part of the tokio runtime.
#[derive(Debug, Clone)]
pub struct ReadinessSignal {
    tx: mpsc::Sender<()>,
}

impl ReadinessSignal {
    /// Report that the device can accept messages
    ///
    /// Returns `true` if a new resync was queued, `false` if one was already
    /// pending or the worker is gone.
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => {
                trace!("Readiness signal queued");
                true
            }
            Err(TrySendError::Full(())) => {
                trace!("Readiness signal already pending, dropped");
                false
            }
            Err(TrySendError::Closed(())) => {
                trace!("Readiness signal dropped, resync worker stopped");
                false
            }
        }
    }
}

/// Consumer side, owned by the resync worker
#[derive(Debug)]
pub struct ReadinessMailbox {
    rx: mpsc::Receiver<()>,
}

impl ReadinessMailbox {
    /// Wait for the next signal
    ///
    /// Returns `false` once every [`ReadinessSignal`] has been dropped.
    pub async fn recv(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_burst_collapses_to_one_signal() {
        let (signal, mut mailbox) = readiness_channel();

        assert!(signal.notify());
        for _ in 0..20 {
            assert!(!signal.notify());
        }

        assert!(mailbox.recv().await);

        // Nothing else is pending
        let second = tokio::time::timeout(Duration::from_millis(20), mailbox.recv()).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_slot_frees_after_consume() {
        let (signal, mut mailbox) = readiness_channel();

        assert!(signal.notify());
        assert!(mailbox.recv().await);
        assert!(signal.notify());
        assert!(mailbox.recv().await);
    }

    #[tokio::test]
    async fn test_notify_from_plain_threads() {
        let (signal, mut mailbox) = readiness_channel();

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        signal.notify();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert!(mailbox.recv().await);
        let second = tokio::time::timeout(Duration::from_millis(20), mailbox.recv()).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_closed_mailbox() {
        let (signal, mailbox) = readiness_channel();
        drop(mailbox);
        assert!(!signal.notify());

        let (signal, mut mailbox) = readiness_channel();
        drop(signal);
        assert!(!mailbox.recv().await);
    }
}
