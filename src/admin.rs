//! # Thin client for the proxy admin endpoint.
//!
//! [`AdminClient`] performs single `GET` requests against
//! `http://<bind-address>:<adminPort>` and hands back the raw bytes. It is
//! deliberately dumb:
//!
//! - **Zero retries.** A failed fetch is a soft error the caller records as
//!   missing diagnostic data.
//! - **No readiness logic.** The admin port only answers once the proxy
//!   finished its own startup; collectors that need readiness poll for it
//!   themselves (see `hooks::AdminDataCollector`).
//! - **No shared mutable state.** Clone freely; concurrent use by multiple
//!   hooks needs no synchronization.

use std::time::Duration;

use crate::error::AdminError;

/// HTTP client bound to the proxy's administrative listener.
#[derive(Clone, Debug)]
pub struct AdminClient {
    base: Option<String>,
    http: reqwest::Client,
}

impl AdminClient {
    /// Creates a client for `http://<address>:<port>`.
    pub fn new(address: &str, port: u16) -> Self {
        Self {
            base: Some(format!("http://{address}:{port}")),
            http: Self::http_client(),
        }
    }

    /// Creates a client for a disabled admin interface; every `get` returns
    /// [`AdminError::Disabled`].
    pub fn disabled() -> Self {
        Self {
            base: None,
            http: Self::http_client(),
        }
    }

    fn http_client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default()
    }

    /// Whether the admin interface is reachable in principle.
    ///
    /// Collectors use this to no-op instead of recording `Disabled` errors.
    pub fn enabled(&self) -> bool {
        self.base.is_some()
    }

    /// Fetches `path` (e.g. `/server_info`) and returns the response body
    /// verbatim.
    ///
    /// Exactly one round trip; non-2xx statuses become
    /// [`AdminError::Status`].
    pub async fn get(&self, path: &str) -> Result<Vec<u8>, AdminError> {
        let base = self.base.as_deref().ok_or(AdminError::Disabled)?;
        let url = format!("{base}{path}");
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AdminError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_client_yields_disabled() {
        let client = AdminClient::disabled();
        assert!(!client.enabled());
        let err = client.get("/server_info").await.unwrap_err();
        assert!(matches!(err, AdminError::Disabled));
    }

    #[tokio::test]
    async fn unreachable_port_is_a_soft_transport_error() {
        // Port 1 is essentially never listening; connection is refused fast.
        let client = AdminClient::new("127.0.0.1", 1);
        assert!(client.enabled());
        let err = client.get("/clusters").await.unwrap_err();
        assert!(matches!(err, AdminError::Http(_)));
    }
}
