//! Layered configuration resolution
//!
//! Implements the 4-layer configuration fold:
//! 1. Built-in defaults
//! 2. `.windward` config file
//! 3. `WINDWARD_*` environment variables
//! 4. Command-line flags

mod defaults;
mod env;
mod file;
mod merge;
mod resolved;

pub use defaults::{
    BuiltinDefaults, ConventionalTls, CONVENTIONAL_CA_CERT, CONVENTIONAL_CERT_FILE,
    CONVENTIONAL_KEY_FILE, DEFAULT_DIAL_TIMEOUT_SECONDS, DEFAULT_ENDPOINT, DEFAULT_OUT,
    DEFAULT_UUID,
};
pub use env::{env_key, EnvSource, ENV_PREFIX};
pub use file::{
    load_file_layer, parse_file_config, FileFormat, SearchPaths, SourceError, CANDIDATE_NAMES,
    CONFIG_NAME,
};
pub use merge::{merge_layers, ConfigLayer, ConfigOrigin, Field, PartialConfig, Provenance};
pub use resolved::{
    resolve, resolve_traced, ConfigSource, Resolution, ResolvedConfig, TlsTriple,
    ValidationError, MAX_DIAL_TIMEOUT_SECONDS,
};

/// Collect every layer in priority order (defaults < file < env < flags).
pub fn gather_layers(
    defaults: &BuiltinDefaults,
    search: &SearchPaths,
    env: &EnvSource,
    flags: PartialConfig,
) -> Result<Vec<ConfigLayer>, SourceError> {
    let mut layers = vec![defaults.to_layer()];
    if let Some(file) = search.load_layer()? {
        layers.push(file);
    }
    layers.push(env.to_layer()?);
    layers.push(ConfigLayer::new(ConfigOrigin::Flags, flags));
    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_gather_layers_order() {
        let home = TempDir::new().unwrap();
        fs::write(home.path().join(".windward"), "uuid = \"file\"").unwrap();
        let search = SearchPaths::with_dirs(None, Some(home.path().to_path_buf()), None);
        let env = EnvSource::from_vars([("WINDWARD_UUID", "env")]);

        let layers = gather_layers(
            &BuiltinDefaults::default(),
            &search,
            &env,
            PartialConfig::default(),
        )
        .unwrap();

        let origins: Vec<_> = layers.iter().map(|l| l.origin).collect();
        assert_eq!(
            origins,
            vec![
                ConfigOrigin::Builtin,
                ConfigOrigin::File,
                ConfigOrigin::Env,
                ConfigOrigin::Flags
            ]
        );
        assert_eq!(resolve(&layers).unwrap().uuid(), "env");
    }

    #[test]
    fn test_gather_layers_without_file() {
        let layers = gather_layers(
            &BuiltinDefaults::default(),
            &SearchPaths::default(),
            &EnvSource::default(),
            PartialConfig::default(),
        )
        .unwrap();
        assert_eq!(layers.len(), 3);
    }
}
