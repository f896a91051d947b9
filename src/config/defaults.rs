//! Built-in defaults (layer 1)
//!
//! Hardcoded defaults for every logical key. The conventional TLS paths are
//! only supplied on request, since a defaults-only run must not imply TLS.

use serde::{Deserialize, Serialize};

use super::merge::{ConfigLayer, ConfigOrigin, PartialConfig};

/// Default cluster endpoint
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:2380";

/// Default cluster UUID token
pub const DEFAULT_UUID: &str = "default";

/// Default output destination
pub const DEFAULT_OUT: &str = "/etc/";

/// Default dial timeout in seconds
pub const DEFAULT_DIAL_TIMEOUT_SECONDS: u64 = 5;

/// Conventional CA certificate location
pub const CONVENTIONAL_CA_CERT: &str = "/etcd/etcd/ssl/client-ca.pem";

/// Conventional client certificate location
pub const CONVENTIONAL_CERT_FILE: &str = "/etcd/etcd/ssl/client.pem";

/// Conventional client key location
pub const CONVENTIONAL_KEY_FILE: &str = "/etcd/etcd/ssl/client-key.pem";

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Cluster endpoints (default: 127.0.0.1:2380)
    pub endpoints: Vec<String>,

    /// Cluster UUID (default: "default")
    pub uuid: String,

    /// Output destination (default: "/etc/")
    pub out: String,

    /// Dial timeout in seconds (default: 5)
    pub dial_timeout_seconds: u64,

    /// Conventional TLS paths, when enabled
    pub tls: Option<ConventionalTls>,
}

/// The conventional client TLS triple under `/etcd/etcd/ssl`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConventionalTls {
    pub ca_cert: String,
    pub cert_file: String,
    pub key_file: String,
}

impl Default for ConventionalTls {
    fn default() -> Self {
        Self {
            ca_cert: CONVENTIONAL_CA_CERT.to_string(),
            cert_file: CONVENTIONAL_CERT_FILE.to_string(),
            key_file: CONVENTIONAL_KEY_FILE.to_string(),
        }
    }
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            endpoints: vec![DEFAULT_ENDPOINT.to_string()],
            uuid: DEFAULT_UUID.to_string(),
            out: DEFAULT_OUT.to_string(),
            dial_timeout_seconds: DEFAULT_DIAL_TIMEOUT_SECONDS,
            tls: None,
        }
    }
}

impl BuiltinDefaults {
    /// Also default the TLS triple to its conventional paths
    pub fn with_conventional_tls(mut self) -> Self {
        self.tls = Some(ConventionalTls::default());
        self
    }

    /// Convert to the lowest-priority config layer
    pub fn to_layer(&self) -> ConfigLayer {
        let tls = self.tls.clone();
        ConfigLayer::new(
            ConfigOrigin::Builtin,
            PartialConfig {
                output: Some(self.out.clone()),
                endpoints: Some(self.endpoints.clone()),
                uuid: Some(self.uuid.clone()),
                ca_cert: tls.as_ref().map(|t| t.ca_cert.clone()),
                cert_file: tls.as_ref().map(|t| t.cert_file.clone()),
                key_file: tls.map(|t| t.key_file),
                dial_timeout_seconds: Some(self.dial_timeout_seconds),
            },
        )
    }
}
