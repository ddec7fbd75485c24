//! State module - cached Control Change values
//!
//! Holds the CC cache shared by the HTTP handlers and the resync worker,
//! the `"<channel>:<controller>"` key codec, and the startup loader that
//! seeds the cache from the device's `init.json`.

mod key;
mod loader;
mod store;

pub use key::{parse_decimal_u8, CcAddress};
pub use loader::{load_initial_state, seed_cache, LoadReport};
pub use store::{CcCache, CcEntry};
