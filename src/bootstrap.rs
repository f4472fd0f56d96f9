//! # Bootstrap rendering.
//!
//! Renders the startup configuration document handed to the proxy binary:
//! the admin listener, node identity, an `xds-grpc` cluster when a
//! control-plane address is configured, and whatever extra fields pre-start
//! hooks stamped into the configuration.
//!
//! Extra fields are merged **last**, so hook-written values override the
//! rendered defaults. The document is written into the debug store as
//! `bootstrap.json`, which doubles as a diagnostic artifact.

use std::io;
use std::path::PathBuf;

use serde_json::{json, Value};

use crate::config::RuntimeConfig;
use crate::error::StoreError;
use crate::store::{DebugStore, BOOTSTRAP_FILE};

/// Renders the bootstrap document for a fully-resolved configuration.
pub fn render(cfg: &RuntimeConfig) -> Value {
    let mut doc = json!({
        "node": {
            "id": "proxyvisor",
            "cluster": cfg.mode.to_string(),
        },
        "admin": {
            "access_log_path": "/dev/null",
            "address": {
                "socket_address": {
                    "address": cfg.bind_address(),
                    "port_value": cfg.admin_port,
                }
            }
        },
    });

    if let Some(addr) = &cfg.control_plane_address {
        doc["dynamic_resources"] = json!({
            "ads_config": {
                "api_type": "GRPC",
                "grpc_services": [ { "envoy_grpc": { "cluster_name": "xds-grpc" } } ],
            }
        });
        doc["static_resources"] = json!({
            "clusters": [ {
                "name": "xds-grpc",
                "type": "STRICT_DNS",
                "http2_protocol_options": {},
                "load_assignment": xds_load_assignment(addr),
            } ]
        });
    }

    if let Some(obj) = doc.as_object_mut() {
        for (key, value) in &cfg.extra_bootstrap {
            obj.insert(key.clone(), value.clone());
        }
    }
    doc
}

/// Splits `host:port` into the endpoint shape the cluster expects.
fn xds_load_assignment(addr: &str) -> Value {
    let (host, port) = match addr.rsplit_once(':') {
        Some((h, p)) => (h, p.parse::<u16>().unwrap_or(0)),
        None => (addr, 0),
    };
    json!({
        "cluster_name": "xds-grpc",
        "endpoints": [ {
            "lb_endpoints": [ {
                "endpoint": {
                    "address": {
                        "socket_address": { "address": host, "port_value": port }
                    }
                }
            } ]
        } ]
    })
}

/// Renders the bootstrap and writes it into the debug store, returning the
/// path handed to the child process.
pub async fn write(store: &DebugStore, cfg: &RuntimeConfig) -> Result<PathBuf, StoreError> {
    let doc = render(cfg);
    // The child must never be handed a truncated document; a document that
    // cannot be serialized fails the run like any other store error.
    let bytes = serde_json::to_vec_pretty(&doc).map_err(|e| StoreError {
        path: store.path().join(BOOTSTRAP_FILE),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })?;
    store.write(BOOTSTRAP_FILE, &bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_admin_listener() {
        let mut cfg = RuntimeConfig::new("/bin/true");
        cfg.admin_port = 15000;
        let doc = render(&cfg);
        assert_eq!(
            doc["admin"]["address"]["socket_address"]["port_value"],
            json!(15000)
        );
        assert_eq!(
            doc["admin"]["address"]["socket_address"]["address"],
            json!("127.0.0.1")
        );
        assert!(doc.get("static_resources").is_none());
    }

    #[test]
    fn renders_xds_cluster_when_control_plane_configured() {
        let mut cfg = RuntimeConfig::new("/bin/true");
        cfg.control_plane_address = Some("pilot.local:15010".into());
        let doc = render(&cfg);
        let cluster = &doc["static_resources"]["clusters"][0];
        assert_eq!(cluster["name"], json!("xds-grpc"));
        let endpoint = &cluster["load_assignment"]["endpoints"][0]["lb_endpoints"][0]["endpoint"];
        assert_eq!(
            endpoint["address"]["socket_address"]["address"],
            json!("pilot.local")
        );
        assert_eq!(
            endpoint["address"]["socket_address"]["port_value"],
            json!(15010)
        );
    }

    #[test]
    fn extras_override_rendered_defaults() {
        let mut cfg = RuntimeConfig::new("/bin/true");
        cfg.extra_bootstrap.insert(
            "node".into(),
            json!({ "id": "custom", "metadata": { "discoveryAddress": "1.2.3.4:15010" } }),
        );
        let doc = render(&cfg);
        assert_eq!(doc["node"]["id"], json!("custom"));
        assert_eq!(
            doc["node"]["metadata"]["discoveryAddress"],
            json!("1.2.3.4:15010")
        );
    }

    #[tokio::test]
    async fn writes_into_the_store() {
        let base = tempfile::tempdir().unwrap();
        let store = DebugStore::create(base.path()).unwrap();
        let cfg = RuntimeConfig::new("/bin/true");

        let path = write(&store, &cfg).await.unwrap();
        assert_eq!(path.file_name().unwrap(), BOOTSTRAP_FILE);

        // The file on disk is a complete document, never empty or truncated.
        let bytes = std::fs::read(&path).unwrap();
        assert!(!bytes.is_empty());
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc["node"]["id"], json!("proxyvisor"));
        assert!(doc["admin"]["address"]["socket_address"].is_object());
    }
}
