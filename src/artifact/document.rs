//! TOML artifact
//!
//! ```toml
//! schema-version = 1
//! generated-at = "2026-10-19T12:00:00Z"
//!
//! [cluster]
//! uuid = "prod"
//! endpoints = ["10.0.0.1:2379", "10.0.0.2:2379"]
//! dial-timeout-seconds = 5
//!
//! [tls]
//! ca-cert = "/etcd/etcd/ssl/client-ca.pem"
//! cert-file = "/etcd/etcd/ssl/client.pem"
//! key-file = "/etcd/etcd/ssl/client-key.pem"
//!
//! [windward]
//! output = "/etc/etcd-client.toml"
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ArtifactError;
use crate::config::{PartialConfig, ResolvedConfig};

/// Current artifact schema version
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Document {
    schema_version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    generated_at: Option<DateTime<Utc>>,

    cluster: ClusterSection,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tls: Option<TlsSection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    windward: Option<WindwardSection>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ClusterSection {
    uuid: String,
    endpoints: Vec<String>,
    dial_timeout_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct TlsSection {
    ca_cert: String,
    cert_file: String,
    key_file: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct WindwardSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Render a resolved configuration as a TOML document
pub fn render(config: &ResolvedConfig, generated_at: DateTime<Utc>) -> Result<String, toml::ser::Error> {
    let windward = WindwardSection {
        input: config.input().map(path_string),
        output: config.output().map(path_string),
    };

    let document = Document {
        schema_version: SCHEMA_VERSION,
        generated_at: Some(generated_at),
        cluster: ClusterSection {
            uuid: config.uuid().to_string(),
            endpoints: config.endpoint_strings(),
            dial_timeout_seconds: config.dial_timeout().as_secs(),
        },
        tls: config.tls().map(|tls| TlsSection {
            ca_cert: path_string(&tls.ca_cert),
            cert_file: path_string(&tls.cert_file),
            key_file: path_string(&tls.key_file),
        }),
        windward: (windward.input.is_some() || windward.output.is_some()).then_some(windward),
    };

    toml::to_string(&document)
}

/// Parse a TOML artifact back into a resolved configuration
pub fn parse(contents: &str) -> Result<ResolvedConfig, ArtifactError> {
    let document: Document = toml::from_str(contents)?;
    if document.schema_version != SCHEMA_VERSION {
        return Err(ArtifactError::UnsupportedSchema(document.schema_version));
    }

    let tls = document.tls;
    let windward = document.windward.unwrap_or(WindwardSection {
        input: None,
        output: None,
    });

    let values = PartialConfig {
        output: windward.output,
        endpoints: Some(document.cluster.endpoints),
        uuid: Some(document.cluster.uuid),
        ca_cert: tls.as_ref().map(|t| t.ca_cert.clone()),
        cert_file: tls.as_ref().map(|t| t.cert_file.clone()),
        key_file: tls.map(|t| t.key_file),
        dial_timeout_seconds: Some(document.cluster.dial_timeout_seconds),
    };

    Ok(ResolvedConfig::validate(values, windward.input.map(PathBuf::from))?)
}
