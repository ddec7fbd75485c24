//! Error types for the bridge library
//!
//! Application-level code (startup, transport connect) uses `anyhow`;
//! these enums cover the failures callers are expected to match on.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to parse a `"<channel>:<controller>"` cache key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The key does not contain exactly one `:` separator
    #[error("expected exactly one ':' separator, found {found}")]
    Separator { found: usize },

    /// One side of the key is not a decimal integer in 0..=255
    #[error("invalid {part} '{text}'")]
    Number { part: &'static str, text: String },
}

/// Errors produced by the bridge core
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A cache key or request parameter could not be parsed
    #[error("malformed key '{key}': {reason}")]
    MalformedKey { key: String, reason: KeyError },

    /// The initial state file could not be read
    #[error("failed to read initial state from {}", .path.display())]
    StartupIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The initial state file is not a `{"ch:cc": value}` JSON object
    #[error("failed to parse initial state in {}", .path.display())]
    StartupParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl BridgeError {
    /// Short stable label for log fields
    pub fn as_label(&self) -> &'static str {
        match self {
            BridgeError::MalformedKey { .. } => "malformed_key",
            BridgeError::StartupIo { .. } => "startup_io",
            BridgeError::StartupParse { .. } => "startup_parse",
        }
    }
}
