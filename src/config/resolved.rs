//! Resolved configuration
//!
//! The canonical, fully merged and validated configuration record. It is
//! built once per invocation and never mutated afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use super::merge::{merge_layers, ConfigLayer, ConfigOrigin, Field, PartialConfig, Provenance};
use crate::endpoint::{Endpoint, EndpointError};

/// Upper bound for the dial timeout, in seconds
pub const MAX_DIAL_TIMEOUT_SECONDS: u64 = 300;

/// Mutually authenticated TLS material; always complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsTriple {
    pub ca_cert: PathBuf,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// Fully merged, validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    endpoints: Vec<Endpoint>,
    uuid: String,
    tls: Option<TlsTriple>,
    dial_timeout: Duration,
}

/// A contributing layer, as recorded for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,
    pub path: Option<PathBuf>,
    pub digest: Option<String>,
}

/// Result of resolution with provenance
#[derive(Debug, Clone)]
pub struct Resolution {
    pub config: ResolvedConfig,
    pub provenance: Provenance,
    pub sources: Vec<ConfigSource>,
}

/// Violations of the resolved configuration invariants
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("endpoints: at least one endpoint is required")]
    EmptyEndpoints,

    #[error("endpoints: '{endpoint}' is invalid: {reason}")]
    InvalidEndpoint {
        endpoint: String,
        reason: EndpointError,
    },

    #[error("uuid: must not be empty")]
    EmptyUuid,

    #[error("uuid: '{0}' must not contain whitespace")]
    InvalidUuid(String),

    #[error("partial TLS configuration: {} set but {} missing", .set.join(", "), .missing.join(", "))]
    PartialTls {
        set: Vec<&'static str>,
        missing: Vec<&'static str>,
    },

    #[error("dial-timeout: must be in (0, 300] seconds, got {0}")]
    DialTimeoutOutOfBounds(u64),
}

/// Fold layers left to right and validate the result.
pub fn resolve(layers: &[ConfigLayer]) -> Result<ResolvedConfig, ValidationError> {
    resolve_traced(layers).map(|resolution| resolution.config)
}

/// Like [`resolve`], also reporting which layer supplied each field.
pub fn resolve_traced(layers: &[ConfigLayer]) -> Result<Resolution, ValidationError> {
    let (merged, provenance) = merge_layers(layers);

    let input = layers
        .iter()
        .rev()
        .find(|layer| layer.origin == ConfigOrigin::File)
        .and_then(|layer| layer.path.clone());

    let config = ResolvedConfig::validate(merged, input)?;

    for (field, origin) in provenance.iter() {
        debug!(key = field.key(), ?origin, "resolved field");
    }

    let sources = layers
        .iter()
        .map(|layer| ConfigSource {
            origin: layer.origin,
            path: layer.path.clone(),
            digest: layer.digest.clone(),
        })
        .collect();

    Ok(Resolution {
        config,
        provenance,
        sources,
    })
}

impl Resolution {
    /// Destination to emit to, if one was explicitly requested.
    ///
    /// The built-in `out` default never triggers emission on its own, and an
    /// explicitly empty `out` disables it.
    pub fn emit_destination(&self) -> Option<&Path> {
        match self.provenance.origin(Field::Output) {
            None | Some(ConfigOrigin::Builtin) => None,
            Some(_) => self.config.output(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ResolvedConfig {
    /// Check a merged configuration against the invariants and build the
    /// immutable record.
    pub fn validate(
        merged: PartialConfig,
        input: Option<PathBuf>,
    ) -> Result<Self, ValidationError> {
        let raw_endpoints = merged.endpoints.unwrap_or_default();
        if raw_endpoints.is_empty() {
            return Err(ValidationError::EmptyEndpoints);
        }
        let endpoints = raw_endpoints
            .iter()
            .map(|raw| {
                raw.parse::<Endpoint>()
                    .map_err(|reason| ValidationError::InvalidEndpoint {
                        endpoint: raw.clone(),
                        reason,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let uuid = merged.uuid.unwrap_or_default();
        if uuid.is_empty() {
            return Err(ValidationError::EmptyUuid);
        }
        if uuid.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidUuid(uuid));
        }

        let tls = Self::validate_tls(
            non_empty(merged.ca_cert),
            non_empty(merged.cert_file),
            non_empty(merged.key_file),
        )?;

        let dial_timeout_seconds = merged
            .dial_timeout_seconds
            .unwrap_or(super::defaults::DEFAULT_DIAL_TIMEOUT_SECONDS);
        if dial_timeout_seconds == 0 || dial_timeout_seconds > MAX_DIAL_TIMEOUT_SECONDS {
            return Err(ValidationError::DialTimeoutOutOfBounds(dial_timeout_seconds));
        }

        Ok(Self {
            input: input.filter(|p| !p.as_os_str().is_empty()),
            output: non_empty(merged.output).map(PathBuf::from),
            endpoints,
            uuid,
            tls,
            dial_timeout: Duration::from_secs(dial_timeout_seconds),
        })
    }

    fn validate_tls(
        ca_cert: Option<String>,
        cert_file: Option<String>,
        key_file: Option<String>,
    ) -> Result<Option<TlsTriple>, ValidationError> {
        match (ca_cert, cert_file, key_file) {
            (None, None, None) => Ok(None),
            (Some(ca_cert), Some(cert_file), Some(key_file)) => Ok(Some(TlsTriple {
                ca_cert: ca_cert.into(),
                cert_file: cert_file.into(),
                key_file: key_file.into(),
            })),
            (ca_cert, cert_file, key_file) => {
                let members = [
                    (Field::CaCert, ca_cert.is_some()),
                    (Field::CertFile, cert_file.is_some()),
                    (Field::KeyFile, key_file.is_some()),
                ];
                let (set, missing): (Vec<_>, Vec<_>) =
                    members.into_iter().partition(|(_, present)| *present);
                Err(ValidationError::PartialTls {
                    set: set.into_iter().map(|(field, _)| field.key()).collect(),
                    missing: missing.into_iter().map(|(field, _)| field.key()).collect(),
                })
            }
        }
    }

    /// Config file the values were read from, if any
    pub fn input(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Endpoints in their canonical string form
    pub fn endpoint_strings(&self) -> Vec<String> {
        self.endpoints.iter().map(ToString::to_string).collect()
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn tls(&self) -> Option<&TlsTriple> {
        self.tls.as_ref()
    }

    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }
}
