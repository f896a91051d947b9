//! Environment layer
//!
//! Logical keys map to `WINDWARD_`-prefixed variables: the key is upper-cased
//! and `.` / `-` become `_`, so `ca-cert` (or `ca.cert`) reads as
//! `WINDWARD_CA_CERT`. Variables that are set but empty count as unset.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::file::SourceError;
use super::merge::{ConfigLayer, ConfigOrigin, Field, PartialConfig};
use crate::endpoint::split_list;

/// Prefix for all windward environment variables
pub const ENV_PREFIX: &str = "WINDWARD";

/// Logical key naming an explicit config file
pub const CONFIG_KEY: &str = "config";

/// Environment variable name for a logical key
pub fn env_key(logical: &str) -> String {
    let suffix: String = logical
        .chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();
    format!("{ENV_PREFIX}_{suffix}")
}

/// Snapshot of the windward-relevant environment
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: BTreeMap<String, String>,
}

impl EnvSource {
    /// Capture the process environment. Non-UTF-8 variables are skipped.
    pub fn from_process() -> Self {
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let prefix = format!("{ENV_PREFIX}_");
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k.starts_with(&prefix))
            .collect();
        Self { vars }
    }

    /// Value for a logical key; empty values are treated as unset
    pub fn get(&self, logical: &str) -> Option<&str> {
        self.vars
            .get(&env_key(logical))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Config file path named by `WINDWARD_CONFIG`
    pub fn config_path(&self) -> Option<PathBuf> {
        self.get(CONFIG_KEY).map(PathBuf::from)
    }

    /// Build the environment layer
    pub fn to_layer(&self) -> Result<ConfigLayer, SourceError> {
        let owned = |field: Field| self.get(field.key()).map(str::to_string);

        let dial_timeout_seconds = match self.get(Field::DialTimeout.key()) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                SourceError::InvalidValue {
                    key: env_key(Field::DialTimeout.key()),
                    value: raw.to_string(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        Ok(ConfigLayer::new(
            ConfigOrigin::Env,
            PartialConfig {
                output: owned(Field::Output),
                endpoints: self.get(Field::Endpoints.key()).map(split_list),
                uuid: owned(Field::Uuid),
                ca_cert: owned(Field::CaCert),
                cert_file: owned(Field::CertFile),
                key_file: owned(Field::KeyFile),
                dial_timeout_seconds,
            },
        ))
    }
}
