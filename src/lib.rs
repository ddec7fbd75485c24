//! MIDI CC Bridge
//!
//! Caches the last-known value of every MIDI Control Change parameter behind
//! a small HTTP API, and replays the whole cache to the device each time its
//! output becomes ready, so that a device that drops off the bus and returns
//! ends up in the state the web UI shows.

pub mod api;
pub mod config;
pub mod error;
pub mod midi;
pub mod resync;
pub mod state;
pub mod transport;

pub use error::{BridgeError, KeyError};
