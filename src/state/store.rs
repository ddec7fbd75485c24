//! CcCache - last-known value of every Control Change parameter
//!
//! Single source of truth for what the UI and the device should show.
//! One readers-writer lock guards the map; it is held only for the duration
//! of a single get/set/snapshot, never while values are being sent.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use super::key::CcAddress;

/// One cached parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcEntry {
    pub addr: CcAddress,
    pub value: u8,
}

/// Concurrent map from CC address to last-known value
#[derive(Debug, Default)]
pub struct CcCache {
    values: RwLock<HashMap<CcAddress, u8>>,
}

impl CcCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value, or 0 if the address was never written
    pub fn get(&self, addr: CcAddress) -> u8 {
        self.values.read().get(&addr).copied().unwrap_or_default()
    }

    /// Insert or overwrite (last writer wins)
    pub fn set(&self, addr: CcAddress, value: u8) {
        self.values.write().insert(addr, value);
    }

    /// Point-in-time copy of every entry, in no particular order
    pub fn snapshot(&self) -> Vec<CcEntry> {
        self.values
            .read()
            .iter()
            .map(|(&addr, &value)| CcEntry { addr, value })
            .collect()
    }

    /// Whole cache keyed by canonical `"<channel>:<controller>"` strings
    pub fn to_key_map(&self) -> BTreeMap<String, u8> {
        self.snapshot()
            .into_iter()
            .map(|entry| (entry.addr.to_key(), entry.value))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}
