//! Configuration merge logic
//!
//! Layers are folded left to right. Each field is replaced only when the
//! later layer supplies it; an omitted field keeps the earlier value.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Origin of a configuration layer, in increasing priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Env,
    Flags,
}

/// Logical configuration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Output,
    Endpoints,
    Uuid,
    CaCert,
    CertFile,
    KeyFile,
    DialTimeout,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Output,
        Field::Endpoints,
        Field::Uuid,
        Field::CaCert,
        Field::CertFile,
        Field::KeyFile,
        Field::DialTimeout,
    ];

    /// Logical key name as used in config files and environment variables
    pub fn key(self) -> &'static str {
        match self {
            Field::Output => "out",
            Field::Endpoints => "endpoints",
            Field::Uuid => "uuid",
            Field::CaCert => "ca-cert",
            Field::CertFile => "cert-file",
            Field::KeyFile => "key-file",
            Field::DialTimeout => "dial-timeout",
        }
    }
}

/// A configuration layer's values; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialConfig {
    pub output: Option<String>,
    pub endpoints: Option<Vec<String>>,
    pub uuid: Option<String>,
    pub ca_cert: Option<String>,
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
    pub dial_timeout_seconds: Option<u64>,
}

impl PartialConfig {
    /// Overlay `later` on top of `self`: present fields in `later` win.
    pub fn overlay(self, later: PartialConfig) -> PartialConfig {
        PartialConfig {
            output: later.output.or(self.output),
            endpoints: later.endpoints.or(self.endpoints),
            uuid: later.uuid.or(self.uuid),
            ca_cert: later.ca_cert.or(self.ca_cert),
            cert_file: later.cert_file.or(self.cert_file),
            key_file: later.key_file.or(self.key_file),
            dial_timeout_seconds: later.dial_timeout_seconds.or(self.dial_timeout_seconds),
        }
    }

    pub fn is_set(&self, field: Field) -> bool {
        match field {
            Field::Output => self.output.is_some(),
            Field::Endpoints => self.endpoints.is_some(),
            Field::Uuid => self.uuid.is_some(),
            Field::CaCert => self.ca_cert.is_some(),
            Field::CertFile => self.cert_file.is_some(),
            Field::KeyFile => self.key_file.is_some(),
            Field::DialTimeout => self.dial_timeout_seconds.is_some(),
        }
    }

    /// Fields this layer supplies
    pub fn present_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| self.is_set(*field))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }
}

/// One entry of the layered source list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    /// Where these values came from
    pub origin: ConfigOrigin,

    /// File path (file layers only)
    pub path: Option<PathBuf>,

    /// SHA-256 digest of raw file bytes (file layers only)
    pub digest: Option<String>,

    pub values: PartialConfig,
}

impl ConfigLayer {
    pub fn new(origin: ConfigOrigin, values: PartialConfig) -> Self {
        Self {
            origin,
            path: None,
            digest: None,
            values,
        }
    }
}

/// Which layer supplied each resolved field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    origins: BTreeMap<Field, ConfigOrigin>,
}

impl Provenance {
    pub fn origin(&self, field: Field) -> Option<ConfigOrigin> {
        self.origins.get(&field).copied()
    }

    fn record(&mut self, field: Field, origin: ConfigOrigin) {
        self.origins.insert(field, origin);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, ConfigOrigin)> + '_ {
        self.origins.iter().map(|(field, origin)| (*field, *origin))
    }
}

/// Merge layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: &[ConfigLayer]) -> (PartialConfig, Provenance) {
    layers.iter().fold(
        (PartialConfig::default(), Provenance::default()),
        |(merged, mut provenance), layer| {
            for field in layer.values.present_fields() {
                provenance.record(field, layer.origin);
            }
            (merged.overlay(layer.values.clone()), provenance)
        },
    )
}
