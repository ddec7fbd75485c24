//! Device transport
//!
//! The bridge only ever needs one thing from a transport: push a Control
//! Change towards the device without waiting. Readiness flows the other
//! way, through a [`ReadinessSignal`](crate::resync::ReadinessSignal) the
//! transport is handed at start.

pub mod midi_out;
pub mod recording;

pub use midi_out::{list_output_ports, MidiOutTransport};
pub use recording::RecordingTransport;

/// Fire-and-forget Control Change sink
///
/// Implementations must return immediately; delivery failures are handled
/// (and logged) inside the transport, never reported to the caller.
pub trait CcTransport: Send + Sync {
    fn send_cc(&self, channel: u8, controller: u8, value: u8);
}
