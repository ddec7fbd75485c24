//! In-memory transport that records every message it is given

use parking_lot::Mutex;

use super::CcTransport;
use crate::midi::ControlChange;

/// Transport double for tests: keeps every sent CC in order
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<ControlChange>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything sent so far
    pub fn sent(&self) -> Vec<ControlChange> {
        self.sent.lock().clone()
    }

    /// Drain and return everything sent so far
    pub fn take(&self) -> Vec<ControlChange> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl CcTransport for RecordingTransport {
    fn send_cc(&self, channel: u8, controller: u8, value: u8) {
        self.sent
            .lock()
            .push(ControlChange::new(channel, controller, value));
    }
}
