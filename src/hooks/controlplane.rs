//! # Control-plane bootstrap hook.
//!
//! [`ControlPlaneBootstrap`] is the pre-start mutator that wires the
//! rendered bootstrap to a control plane: it requires a control-plane
//! address in the configuration (or carries its own) and stamps it into the
//! extra bootstrap fields so the proxy's `xds-grpc` cluster points at it.
//!
//! Control-plane-specific templating (full mesh bootstrap documents) stays
//! out of scope; this hook only covers the address plumbing every control
//! plane needs.

use async_trait::async_trait;
use serde_json::json;

use crate::config::RuntimeConfig;
use crate::error::HookError;
use crate::hooks::hook::Hook;

/// Pre-start hook pointing the bootstrap at a control plane.
#[derive(Default)]
pub struct ControlPlaneBootstrap {
    address: Option<String>,
}

impl ControlPlaneBootstrap {
    /// Uses the control-plane address already present in the configuration.
    pub fn new() -> Self {
        Self { address: None }
    }

    /// Overrides the configuration's control-plane address.
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
        }
    }
}

#[async_trait]
impl Hook for ControlPlaneBootstrap {
    fn name(&self) -> &str {
        "control-plane-bootstrap"
    }

    async fn pre_start(&self, cfg: &mut RuntimeConfig) -> Result<(), HookError> {
        if let Some(addr) = &self.address {
            cfg.control_plane_address = Some(addr.clone());
        }
        let addr = cfg
            .control_plane_address
            .clone()
            .ok_or_else(|| HookError::failed("no control-plane address configured"))?;

        cfg.extra_bootstrap.insert(
            "node".to_string(),
            json!({
                "id": "proxyvisor",
                "cluster": cfg.mode.to_string(),
                "metadata": { "discoveryAddress": addr },
            }),
        );
        Ok(())
    }
}
