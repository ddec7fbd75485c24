//! Runtime configuration
//!
//! Built once in `main` from command-line flags (with environment fallbacks)
//! and passed down by value. A device directory holds everything that is
//! specific to one piece of hardware:
//!
//! ```text
//! <device>/init.json   initial CC values, {"<channel>:<controller>": value}
//! <device>/web/        static web UI served at /
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default device directory
pub const DEFAULT_DEVICE_DIR: &str = "../device/example";

/// Default interval between checks that the output port still exists
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 1000;

/// Validated bridge settings
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Case-insensitive substring of the MIDI output port to drive
    pub node: String,
    /// HTTP listen port
    pub http_port: u16,
    /// Device directory (init.json + web/)
    pub device_dir: PathBuf,
    /// Output port liveness probe interval
    pub probe_interval: Duration,
}

impl BridgeConfig {
    pub fn new(
        node: &str,
        http_port: u16,
        device_dir: impl Into<PathBuf>,
        probe_interval_ms: u64,
    ) -> Result<Self> {
        let node = node.trim();
        if node.is_empty() {
            bail!("MIDI node name must not be empty");
        }
        if probe_interval_ms == 0 {
            bail!("Probe interval must be greater than zero");
        }

        Ok(Self {
            node: node.to_string(),
            http_port,
            device_dir: device_dir.into(),
            probe_interval: Duration::from_millis(probe_interval_ms),
        })
    }

    /// Path of the initial state file
    pub fn init_file(&self) -> PathBuf {
        self.device_dir.join("init.json")
    }

    /// Directory of static web UI files
    pub fn web_dir(&self) -> PathBuf {
        self.device_dir.join("web")
    }

    /// HTTP listen address on all interfaces
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.http_port))
    }

    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }
}
