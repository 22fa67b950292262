//! Configuration schema.

use serde::{Deserialize, Serialize};

/// Endpoints and defaults for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Node JSON-RPC endpoint (`host:port` or URL). Empty means no node.
    pub node_addr: String,

    /// Signing daemon endpoint (`host:port` or URL).
    pub sign_addr: String,

    /// Default sender address (hex). Empty means it must be given per call.
    pub addr: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            node_addr: "localhost:8545".to_string(),
            sign_addr: "localhost:4767".to_string(),
            addr: String::new(),
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Node endpoint as a URL, or `None` when no node is configured.
    pub fn node_url(&self) -> Option<String> {
        if self.node_addr.is_empty() {
            None
        } else {
            Some(with_scheme(&self.node_addr))
        }
    }

    /// Signer endpoint as a URL.
    pub fn sign_url(&self) -> String {
        with_scheme(&self.sign_addr)
    }
}

/// Prefix `http://` when the address carries no scheme.
pub fn with_scheme(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{}", addr)
    }
}
