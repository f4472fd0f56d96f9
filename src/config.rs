//! # Runtime configuration for one proxy run.
//!
//! Provides [`RuntimeConfig`], the mutable configuration a [`Runtime`]
//! (crate::Runtime) owns for the duration of exactly one run. Pre-start
//! hooks receive a mutable reference and may rewrite any field before the
//! bootstrap is rendered; after spawn the configuration is frozen.
//!
//! ## Sentinel values
//! - `admin_port = 0` is valid only together with `admin_disabled = true`
//!   (collectors then no-op instead of erroring).
//! - empty `ip_addresses` → the bootstrap binds the admin listener to
//!   `127.0.0.1`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Listening mode of the proxy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Plain sidecar/standalone proxy.
    #[default]
    Standalone,
    /// Front proxy / load-balancer mode.
    LoadBalancer,
}

impl Mode {
    /// Parses a mode string; unknown strings fall back to
    /// [`Mode::Standalone`].
    pub fn parse(s: &str) -> Mode {
        match s.trim().to_ascii_lowercase().as_str() {
            "loadbalancer" | "load-balancer" => Mode::LoadBalancer,
            _ => Mode::Standalone,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Standalone => f.write_str("standalone"),
            Mode::LoadBalancer => f.write_str("loadbalancer"),
        }
    }
}

/// Mutable configuration for one proxy run.
///
/// Owned exclusively by the runtime; hooks get `&mut RuntimeConfig` during
/// the pre-start phase only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Absolute path to the proxy executable.
    pub binary_path: PathBuf,

    /// Listening mode, rendered into the bootstrap node metadata.
    pub mode: Mode,

    /// Admin listener port. Must be non-zero unless `admin_disabled`.
    pub admin_port: u16,

    /// Explicitly disables the admin interface (collectors no-op).
    pub admin_disabled: bool,

    /// Control-plane (XDS) address, `host:port`. Consumed by the
    /// control-plane bootstrap hook and the bootstrap renderer.
    pub control_plane_address: Option<String>,

    /// IP addresses the proxy should bind; first one also hosts the admin
    /// listener. Empty means loopback.
    pub ip_addresses: Vec<String>,

    /// Arbitrary extra bootstrap fields, merged into the rendered document
    /// last so hook-written values win.
    pub extra_bootstrap: Map<String, Value>,

    /// Working directory for the child process. `None` inherits ours.
    pub working_dir: Option<PathBuf>,

    /// Bounded interval between the interrupt and a forced kill.
    pub grace: Duration,

    /// Base directory under which per-run debug stores are created.
    pub debug_base_dir: PathBuf,

    /// Keep the debug store on disk after the run (inspection/tests).
    pub retain_debug_store: bool,
}

impl RuntimeConfig {
    /// Creates a configuration with defaults for everything but the binary.
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            mode: Mode::Standalone,
            admin_port: 15000,
            admin_disabled: false,
            control_plane_address: None,
            ip_addresses: Vec::new(),
            extra_bootstrap: Map::new(),
            working_dir: None,
            grace: Duration::from_secs(5),
            debug_base_dir: std::env::temp_dir().join("proxyvisor"),
            retain_debug_store: false,
        }
    }

    /// Address the admin listener binds to (first bound IP or loopback).
    pub fn bind_address(&self) -> &str {
        self.ip_addresses
            .first()
            .map(String::as_str)
            .unwrap_or("127.0.0.1")
    }

    /// Validates the configuration; must pass before the subprocess is
    /// spawned.
    ///
    /// Covers configuration consistency only: a binary path that is set but
    /// points at nothing surfaces later as a spawn error, since no
    /// subprocess exists either way.
    pub fn validate(&self) -> Result<(), String> {
        if self.binary_path.as_os_str().is_empty() {
            return Err("binary path is empty".to_string());
        }
        if self.admin_port == 0 && !self.admin_disabled {
            return Err("admin port is zero but the admin interface is not disabled".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing() {
        assert_eq!(Mode::parse("loadbalancer"), Mode::LoadBalancer);
        assert_eq!(Mode::parse("LoadBalancer"), Mode::LoadBalancer);
        assert_eq!(Mode::parse("standalone"), Mode::Standalone);
        assert_eq!(Mode::parse("whatever"), Mode::Standalone);
        assert_eq!(Mode::LoadBalancer.to_string(), "loadbalancer");
    }

    #[test]
    fn empty_binary_path_fails_validation() {
        let cfg = RuntimeConfig::new("");
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("binary path"));
    }

    #[test]
    fn zero_admin_port_requires_disabled_flag() {
        let mut cfg = RuntimeConfig::new("/bin/true");
        cfg.admin_port = 0;
        assert!(cfg.validate().is_err());

        cfg.admin_disabled = true;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bind_address_defaults_to_loopback() {
        let mut cfg = RuntimeConfig::new("/bin/true");
        assert_eq!(cfg.bind_address(), "127.0.0.1");
        cfg.ip_addresses = vec!["10.0.0.7".into(), "10.0.0.8".into()];
        assert_eq!(cfg.bind_address(), "10.0.0.7");
    }
}
