use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::upstream_url::DoqUpstreamUrl;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// DoQ upstream URL, e.g. `quic://dns.adguard-dns.com` or `doq://9.9.9.9:853`.
    #[serde(default = "default_address")]
    pub address: String,

    /// Deadline applied to bootstrap, connection opening and each exchange step.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// PEM bundle replacing the built-in webpki roots.
    #[serde(default)]
    pub ca_file: Option<String>,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn url(&self) -> Result<DoqUpstreamUrl, String> {
        self.address.parse()
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            timeout_ms: default_timeout_ms(),
            ca_file: None,
        }
    }
}

fn default_address() -> String {
    "quic://dns.adguard-dns.com".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}
