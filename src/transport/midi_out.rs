//! midir output transport with automatic reconnection
//!
//! A dedicated OS thread owns the MIDI output connection; `send_cc` only
//! pushes bytes into a bounded queue and never blocks. Each time the thread
//! (re)opens the port it raises the readiness signal, which is what makes the
//! resync worker replay the cache after the device comes back.
//!
//! Some backends keep accepting writes after the device is gone, so send
//! errors alone cannot be trusted. While connected, the port list is checked
//! every probe interval regardless of traffic, and a port that vanished or
//! came back under a new id counts as a disconnect.
//!
//! While disconnected, queued messages are discarded: the replay triggered by
//! the next successful connect carries the latest value of every parameter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::CcTransport;
use crate::midi::{ControlChange, HexBytes};
use crate::resync::ReadinessSignal;

/// Outgoing message queue depth
pub const QUEUE_CAPACITY: usize = 1024;

/// Upper bound for the reconnect delay
const MAX_RECONNECT_DELAY_MS: u64 = 10_000;

/// MIDI client name shown to the system
const CLIENT_NAME: &str = "MIDI-CC-Bridge";

/// Reconnect delay for the given attempt number (1-based)
pub fn reconnect_delay(attempt: u32) -> Duration {
    let ms = 250u64.saturating_mul(u64::from(attempt));
    Duration::from_millis(ms.min(MAX_RECONNECT_DELAY_MS))
}

/// Whether the port check is due, given when it last ran
fn probe_due(last_probe: Instant, now: Instant, interval: Duration) -> bool {
    now.saturating_duration_since(last_probe) >= interval
}

/// How long the queue may be waited on before the next port check
fn probe_wait(last_probe: Instant, now: Instant, interval: Duration) -> Duration {
    interval.saturating_sub(now.saturating_duration_since(last_probe))
}

/// Result of looking for the connected port in the current port list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortCheck {
    Present,
    Missing,
    /// A matching port exists but under a different id (replugged)
    Replaced,
}

fn check_port(connected_id: &str, found_id: Option<&str>) -> PortCheck {
    match found_id {
        None => PortCheck::Missing,
        Some(id) if id == connected_id => PortCheck::Present,
        Some(_) => PortCheck::Replaced,
    }
}

fn named_ports(midi_out: &MidiOutput) -> impl Iterator<Item = (MidiOutputPort, String)> + '_ {
    midi_out
        .ports()
        .into_iter()
        .filter_map(move |port| midi_out.port_name(&port).ok().map(|name| (port, name)))
}

/// List the names of all available MIDI output ports
pub fn list_output_ports() -> Result<Vec<String>> {
    let scanner = MidiOutput::new(&format!("{CLIENT_NAME}-Scanner"))
        .context("Failed to create MIDI output for port listing")?;
    Ok(named_ports(&scanner).map(|(_, name)| name).collect())
}

/// First output port whose name contains `pattern`, ignoring case
fn find_output_port(midi_out: &MidiOutput, pattern: &str) -> Option<(MidiOutputPort, String)> {
    let pattern = pattern.to_lowercase();
    named_ports(midi_out).find(|(_, name)| name.to_lowercase().contains(&pattern))
}

/// MIDI output transport backed by midir
pub struct MidiOutTransport {
    node: String,
    queue_tx: Sender<[u8; 3]>,
    shutdown_flag: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl MidiOutTransport {
    /// Start the output thread for the first port whose name contains `node`
    ///
    /// The first connection attempt happens on the new thread, so this
    /// returns immediately even if the device is not present yet.
    pub fn start(node: String, probe_interval: Duration, readiness: ReadinessSignal) -> Result<Self> {
        let (queue_tx, queue_rx) = channel::bounded(QUEUE_CAPACITY);
        let shutdown_flag = Arc::new(AtomicBool::new(false));

        let link_node = node.clone();
        let link_shutdown = shutdown_flag.clone();

        // The connection is created and dropped on this thread only
        let thread = thread::Builder::new()
            .name("midi-out".to_string())
            .spawn(move || {
                OutputLink {
                    node: link_node,
                    probe_interval,
                    readiness,
                    queue_rx,
                    shutdown_flag: link_shutdown,
                    conn: None,
                    port_id: String::new(),
                    last_probe: Instant::now(),
                    attempt: 0,
                }
                .run()
            })
            .context("Failed to spawn MIDI output thread")?;

        info!("MIDI output transport started for '{}'", node);

        Ok(Self {
            node,
            queue_tx,
            shutdown_flag,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Stop the output thread and close the connection
    ///
    /// Blocks until the thread exits, at most about one probe interval.
    pub fn shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);

        if let Some(thread) = self.thread.lock().take() {
            if thread.join().is_err() {
                warn!("MIDI output thread panicked");
            }
        }

        debug!("MIDI output transport for '{}' shut down", self.node);
    }
}

impl CcTransport for MidiOutTransport {
    fn send_cc(&self, channel: u8, controller: u8, value: u8) {
        let msg = ControlChange::new(channel, controller, value);

        match self.queue_tx.try_send(msg.encode()) {
            Ok(()) => trace!("Queued {}", msg),
            Err(TrySendError::Full(_)) => {
                warn!("MIDI output queue full, dropping {}", msg)
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("MIDI output stopped, dropping {}", msg)
            }
        }
    }
}

/// State owned by the output thread
struct OutputLink {
    node: String,
    probe_interval: Duration,
    readiness: ReadinessSignal,
    queue_rx: Receiver<[u8; 3]>,
    shutdown_flag: Arc<AtomicBool>,
    conn: Option<MidiOutputConnection>,
    /// Backend id of the port `conn` was opened on
    port_id: String,
    last_probe: Instant,
    attempt: u32,
}

impl OutputLink {
    fn run(mut self) {
        debug!("MIDI output thread running");

        while !self.shutdown_flag.load(Ordering::SeqCst) {
            if self.conn.is_none() && !self.reconnect() {
                continue;
            }

            let wait = probe_wait(self.last_probe, Instant::now(), self.probe_interval);
            match self.queue_rx.recv_timeout(wait) {
                Ok(bytes) => self.transmit(&bytes),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let now = Instant::now();
            if self.conn.is_some() && probe_due(self.last_probe, now, self.probe_interval) {
                self.last_probe = now;
                self.probe();
            }
        }

        self.disconnect();
        info!("MIDI output for '{}' closed", self.node);
    }

    /// Try to open the port once; on failure wait out the backoff delay
    fn reconnect(&mut self) -> bool {
        match self.open() {
            Ok((conn, port_id, port_name)) => {
                self.conn = Some(conn);
                self.port_id = port_id;
                self.last_probe = Instant::now();
                self.attempt = 0;
                info!("MIDI output connected: '{}' ({})", port_name, self.port_id);
                self.readiness.notify();
                true
            }
            Err(e) => {
                self.attempt = self.attempt.saturating_add(1);
                let delay = reconnect_delay(self.attempt);
                if self.attempt == 1 {
                    warn!("MIDI output unavailable, retrying: {}", e);
                }
                debug!(
                    "MIDI output reconnect #{} for '{}' in {:?}: {}",
                    self.attempt, self.node, delay, e
                );
                self.discard_for(delay);
                false
            }
        }
    }

    fn open(&self) -> Result<(MidiOutputConnection, String, String)> {
        let midi_out = MidiOutput::new(CLIENT_NAME).context("Failed to create MIDI output")?;

        let (port, port_name) = find_output_port(&midi_out, &self.node)
            .ok_or_else(|| anyhow!("Output port '{}' not found", self.node))?;
        let port_id = port.id();
        let conn = midi_out
            .connect(&port, CLIENT_NAME)
            .map_err(|e| anyhow!("Failed to connect to '{}': {}", port_name, e))?;

        Ok((conn, port_id, port_name))
    }

    fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.close();
        }
        self.port_id.clear();
    }

    fn transmit(&mut self, bytes: &[u8]) {
        let Some(conn) = self.conn.as_mut() else {
            trace!("MIDI TX skipped (not connected): {}", HexBytes(bytes));
            return;
        };

        match conn.send(bytes) {
            Ok(()) => trace!("MIDI TX -> {}: {}", self.node, HexBytes(bytes)),
            Err(e) => {
                warn!("MIDI send failed, reconnecting: {}", e);
                self.disconnect();
            }
        }
    }

    /// Drop the connection if its port vanished or was replaced
    fn probe(&mut self) {
        let scanner = match MidiOutput::new(&format!("{CLIENT_NAME}-Probe")) {
            Ok(scanner) => scanner,
            Err(e) => {
                debug!("MIDI port probe unavailable: {}", e);
                return;
            }
        };

        let found = find_output_port(&scanner, &self.node).map(|(port, _)| port.id());
        match check_port(&self.port_id, found.as_deref()) {
            PortCheck::Present => {}
            PortCheck::Missing => {
                warn!("MIDI output port '{}' disappeared", self.node);
                self.disconnect();
            }
            PortCheck::Replaced => {
                warn!(
                    "MIDI output port '{}' came back as {:?}, reconnecting",
                    self.node, found
                );
                self.disconnect();
            }
        }
    }

    /// Throw away queued messages until `delay` has passed or shutdown is requested
    fn discard_for(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        let mut dropped = 0usize;

        while !self.shutdown_flag.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            // Wake regularly so shutdown is not held up by a long backoff
            let wait = (deadline - now).min(Duration::from_millis(250));
            match self.queue_rx.recv_timeout(wait) {
                Ok(_) => dropped += 1,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if dropped > 0 {
            debug!("Dropped {} MIDI messages while disconnected", dropped);
        }
    }
}
