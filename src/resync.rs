//! Reconnect resynchronization
//!
//! The transport raises a [`ReadinessSignal`] whenever the device becomes
//! able to receive MIDI; the [`ResyncWorker`] answers by replaying the whole
//! CC cache so the device converges with what the UI shows.

mod readiness;
mod worker;

pub use readiness::{readiness_channel, ReadinessMailbox, ReadinessSignal};
pub use worker::{ResyncHandle, ResyncWorker};
