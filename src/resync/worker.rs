//! Resync worker - replays the cache to the device on every readiness signal
//!
//! One long-lived task, started explicitly by the composition root. Each
//! signal produces one pass: snapshot the cache, then send every entry.
//! Passes never overlap; a signal raised mid-pass waits in the mailbox and
//! starts the next pass once the current one is done.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::readiness::ReadinessMailbox;
use crate::state::CcCache;
use crate::transport::CcTransport;

/// Background replay loop
pub struct ResyncWorker {
    cache: Arc<CcCache>,
    transport: Arc<dyn CcTransport>,
    mailbox: ReadinessMailbox,
    shutdown_rx: oneshot::Receiver<()>,
    passes: Arc<AtomicU64>,
}

/// Handle to the running worker
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown) also
/// stops the worker after its current pass.
pub struct ResyncHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
    passes: Arc<AtomicU64>,
}

impl ResyncWorker {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(
        cache: Arc<CcCache>,
        transport: Arc<dyn CcTransport>,
        mailbox: ReadinessMailbox,
    ) -> ResyncHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let passes = Arc::new(AtomicU64::new(0));

        let worker = ResyncWorker {
            cache,
            transport,
            mailbox,
            shutdown_rx,
            passes: passes.clone(),
        };

        let task = tokio::spawn(worker.run());

        ResyncHandle {
            shutdown_tx,
            task,
            passes,
        }
    }

    async fn run(mut self) {
        info!("Resync worker started");

        loop {
            tokio::select! {
                biased;

                _ = &mut self.shutdown_rx => {
                    info!("Resync worker shutting down");
                    break;
                }
                signal = self.mailbox.recv() => {
                    if !signal {
                        debug!("All readiness producers dropped, resync worker exiting");
                        break;
                    }
                    self.replay();
                }
            }
        }

        info!(
            "Resync worker stopped after {} passes",
            self.passes.load(Ordering::Relaxed)
        );
    }

    /// One full pass over the cache as it is right now
    fn replay(&self) {
        let snapshot = self.cache.snapshot();
        info!(
            "Device ready → sending {} cached CC values",
            snapshot.len()
        );

        for entry in &snapshot {
            self.transport
                .send_cc(entry.addr.channel, entry.addr.controller, entry.value);
        }

        let pass = self.passes.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Resync pass #{} complete", pass);
    }
}

impl ResyncHandle {
    /// Number of passes finished so far
    pub fn completed_passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Stop the worker after its current pass and wait for it to exit
    pub async fn shutdown(self) {
        // The worker may already have exited on its own
        let _ = self.shutdown_tx.send(());

        if let Err(e) = self.task.await {
            error!("Resync worker task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::ControlChange;
    use crate::resync::readiness_channel;
    use crate::state::CcAddress;
    use crate::transport::RecordingTransport;
    use std::time::Duration;

    async fn wait_for_passes(handle: &ResyncHandle, passes: u64) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while handle.completed_passes() < passes {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("resync pass did not complete in time");
    }

    fn seeded_cache() -> Arc<CcCache> {
        let cache = Arc::new(CcCache::new());
        cache.set(CcAddress::new(0, 1), 10);
        cache.set(CcAddress::new(2, 3), 30);
        cache.set(CcAddress::new(15, 127), 127);
        cache
    }

    fn sorted(mut sent: Vec<ControlChange>) -> Vec<ControlChange> {
        sent.sort_by_key(|cc| (cc.channel, cc.controller));
        sent
    }

    #[tokio::test]
    async fn test_replays_every_entry_once() {
        let cache = seeded_cache();
        let transport = Arc::new(RecordingTransport::new());
        let (signal, mailbox) = readiness_channel();

        let handle = ResyncWorker::spawn(cache, transport.clone(), mailbox);
        signal.notify();
        wait_for_passes(&handle, 1).await;

        assert_eq!(
            sorted(transport.sent()),
            vec![
                ControlChange::new(0, 1, 10),
                ControlChange::new(2, 3, 30),
                ControlChange::new(15, 127, 127),
            ]
        );

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_burst_before_consume_gives_one_pass() {
        let cache = seeded_cache();
        let transport = Arc::new(RecordingTransport::new());
        let (signal, mailbox) = readiness_channel();

        // Signals raised before the worker exists can only be consumed once
        for _ in 0..10 {
            signal.notify();
        }

        let handle = ResyncWorker::spawn(cache, transport.clone(), mailbox);
        wait_for_passes(&handle, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(handle.completed_passes(), 1);
        assert_eq!(transport.count(), 3);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_later_signal_replays_latest_state() {
        let cache = seeded_cache();
        let transport = Arc::new(RecordingTransport::new());
        let (signal, mailbox) = readiness_channel();

        let handle = ResyncWorker::spawn(cache.clone(), transport.clone(), mailbox);
        signal.notify();
        wait_for_passes(&handle, 1).await;
        transport.take();

        cache.set(CcAddress::new(0, 1), 99);
        cache.set(CcAddress::new(4, 4), 44);
        signal.notify();
        wait_for_passes(&handle, 2).await;

        let sent = sorted(transport.sent());
        assert_eq!(sent.len(), 4);
        assert!(sent.contains(&ControlChange::new(0, 1, 99)));
        assert!(sent.contains(&ControlChange::new(4, 4, 44)));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_cache_pass_sends_nothing() {
        let transport = Arc::new(RecordingTransport::new());
        let (signal, mailbox) = readiness_channel();

        let handle = ResyncWorker::spawn(Arc::new(CcCache::new()), transport.clone(), mailbox);
        signal.notify();
        wait_for_passes(&handle, 1).await;

        assert_eq!(transport.count(), 0);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_mailbox() {
        let transport = Arc::new(RecordingTransport::new());
        let (signal, mailbox) = readiness_channel();

        let handle = ResyncWorker::spawn(seeded_cache(), transport.clone(), mailbox);
        tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .expect("shutdown did not complete");

        assert!(!signal.notify());
        assert_eq!(transport.count(), 0);
    }
}
