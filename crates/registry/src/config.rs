// SPDX-License-Identifier: MIT

//! The persistable runtime config. One `RuntimeConfig` schema,
//! forward-compatible via `#[serde(default)]` fields rather than a
//! second legacy reader.

use serde::{Deserialize, Serialize};
use sk_core::{ChildPolicy, RuntimeKind};

use crate::error::{RegistryError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub kind: RuntimeKind,
    pub port: u16,
    #[serde(default)]
    pub udp: bool,
    /// Path to PEM cert+key material; Open Question 1 — never a raw
    /// password/key, which the daemon refuses to persist.
    #[serde(default)]
    pub tls_cert_path: Option<String>,
    #[serde(default)]
    pub tls_key_path: Option<String>,
    #[serde(default)]
    pub script_path: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub child_policy: ChildPolicy,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub backends: Vec<String>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    /// Forward-compatible fields for proxy/cache tunables added after
    /// the original schema — upstreams, mesh-TLS, external/managed
    /// flags, fsync mode — default to inert values on old on-disk JSON.
    #[serde(default)]
    pub upstreams: Vec<String>,
    #[serde(default)]
    pub mesh_tls: bool,
    #[serde(default)]
    pub externally_managed: bool,
    #[serde(default = "default_fsync_every_write")]
    pub fsync_every_write: bool,
    /// Was this runtime running when the daemon last shut down? Used
    /// to decide whether startup replay auto-starts it.
    #[serde(default)]
    pub was_running: bool,
}

fn default_fsync_every_write() -> bool {
    true
}

impl RuntimeConfig {
    /// Create-time validation: port range, backend non-emptiness for
    /// proxies.
    pub fn validate(&self) -> Result<()> {
        if self.kind == RuntimeKind::Proxy && self.backends.is_empty() {
            return Err(RegistryError::InvalidConfig("proxy requires at least one backend".into()));
        }
        if self.kind != RuntimeKind::Client && self.port == 0 {
            return Err(RegistryError::InvalidConfig("port is required for non-client runtimes".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
