//! Initial state loader
//!
//! Seeds the cache once at startup from a device file shaped like
//! `{"0:74": 64, "1:7": 100}`. An unreadable or non-JSON file is fatal;
//! a single malformed key is skipped with a warning.
//!
//! Leading zeros are allowed, so two keys can name the same address
//! (`"1:7"` and `"01:7"`). The canonical spelling wins, otherwise the
//! lexicographically smaller key; the other entry is reported as a duplicate.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;

use tokio::fs;
use tracing::{debug, info, warn};

use super::key::CcAddress;
use super::store::CcCache;
use crate::error::BridgeError;

/// Outcome of a successful load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Distinct addresses written into the cache
    pub loaded: usize,
    /// Entries dropped because their key did not parse
    pub skipped: usize,
    /// Entries dropped because another key named the same address
    pub duplicates: usize,
}

/// Read `path` and write every valid entry into `cache`
pub async fn load_initial_state(
    cache: &CcCache,
    path: impl AsRef<Path>,
) -> Result<LoadReport, BridgeError> {
    let path = path.as_ref();

    let data = fs::read(path).await.map_err(|source| BridgeError::StartupIo {
        path: path.to_path_buf(),
        source,
    })?;

    let initial: HashMap<String, u8> =
        serde_json::from_slice(&data).map_err(|source| BridgeError::StartupParse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(seed_cache(cache, initial))
}

/// Write parsed `"<channel>:<controller>" -> value` pairs into `cache`
pub fn seed_cache(cache: &CcCache, initial: HashMap<String, u8>) -> LoadReport {
    let mut report = LoadReport {
        loaded: 0,
        skipped: 0,
        duplicates: 0,
    };
    let mut chosen: HashMap<CcAddress, (String, u8)> = HashMap::with_capacity(initial.len());

    for (key, value) in initial {
        let addr = match CcAddress::parse(&key) {
            Ok(addr) => addr,
            Err(reason) => {
                let err = BridgeError::MalformedKey { key, reason };
                warn!("Invalid key in initial state, skipping: {}", err);
                report.skipped += 1;
                continue;
            }
        };

        match chosen.entry(addr) {
            Entry::Vacant(slot) => {
                slot.insert((key, value));
            }
            Entry::Occupied(mut slot) => {
                report.duplicates += 1;
                let (kept, dropped) = if preferred_key(addr, &key, &slot.get().0) {
                    let previous = slot.insert((key, value));
                    (slot.get().0.clone(), previous.0)
                } else {
                    (slot.get().0.clone(), key)
                };
                warn!(
                    "Keys '{}' and '{}' both name {}, keeping '{}'",
                    kept, dropped, addr, kept
                );
            }
        }
    }

    for (addr, (_, value)) in chosen {
        debug!("Initial CC {} = {}", addr, value);
        cache.set(addr, value);
        report.loaded += 1;
    }

    info!(
        "Loaded {} CC values into cache ({} skipped, {} duplicates)",
        report.loaded, report.skipped, report.duplicates
    );
    report
}

/// Whether `candidate` should replace `current` as the spelling for `addr`
fn preferred_key(addr: CcAddress, candidate: &str, current: &str) -> bool {
    let canonical = addr.to_key();
    match (candidate == canonical, current == canonical) {
        (true, _) => true,
        (false, true) => false,
        (false, false) => candidate < current,
    }
}
