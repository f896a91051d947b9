//! Config file layer
//!
//! Locates and parses the `.windward` config file. Search order: an explicit
//! path (flag or `WINDWARD_CONFIG`), then `$HOME`, then the working
//! directory. The file may be TOML or JSON; the format follows the extension
//! and defaults to TOML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::merge::{ConfigLayer, ConfigOrigin, PartialConfig};
use crate::endpoint::split_list;

/// Base name of the config file
pub const CONFIG_NAME: &str = ".windward";

/// Candidate file names tried in each search directory
pub const CANDIDATE_NAMES: &[&str] = &[".windward", ".windward.toml", ".windward.json"];

/// Errors reading configuration sources
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse JSON config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{key}: invalid value '{value}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Config file syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Toml,
    Json,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        }
    }
}

/// Endpoints may be written as a list or as a comma-separated string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EndpointList {
    List(Vec<String>),
    Csv(String),
}

/// On-disk shape of the config file
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct FileConfig {
    endpoints: Option<EndpointList>,
    uuid: Option<String>,
    #[serde(alias = "ca-file")]
    ca_cert: Option<String>,
    cert_file: Option<String>,
    key_file: Option<String>,
    out: Option<String>,
    dial_timeout: Option<u64>,
}

impl From<FileConfig> for PartialConfig {
    fn from(file: FileConfig) -> Self {
        PartialConfig {
            output: file.out,
            endpoints: file.endpoints.map(|list| match list {
                EndpointList::List(items) => items.into_iter().map(|s| s.trim().to_string()).collect(),
                EndpointList::Csv(raw) => split_list(&raw),
            }),
            uuid: file.uuid,
            ca_cert: file.ca_cert,
            cert_file: file.cert_file,
            key_file: file.key_file,
            dial_timeout_seconds: file.dial_timeout,
        }
    }
}

/// Directories searched for the config file
#[derive(Debug, Clone, Default)]
pub struct SearchPaths {
    explicit: Option<PathBuf>,
    home: Option<PathBuf>,
    cwd: Option<PathBuf>,
}

impl SearchPaths {
    /// Search paths for this process: `$HOME` and the current directory
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            home: std::env::var_os("HOME").map(PathBuf::from),
            cwd: std::env::current_dir().ok(),
        }
    }

    pub fn with_dirs(explicit: Option<PathBuf>, home: Option<PathBuf>, cwd: Option<PathBuf>) -> Self {
        Self { explicit, home, cwd }
    }

    /// Find the config file to use.
    ///
    /// A missing explicit file is an error; if nothing is found in the search
    /// directories the file layer is simply absent.
    pub fn locate(&self) -> Result<Option<PathBuf>, SourceError> {
        if let Some(path) = &self.explicit {
            if !path.is_file() {
                return Err(SourceError::NotFound(path.clone()));
            }
            return Ok(Some(path.clone()));
        }

        for dir in [&self.home, &self.cwd].into_iter().flatten() {
            for name in CANDIDATE_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Ok(Some(candidate));
                }
            }
        }

        debug!("no {CONFIG_NAME} config file found");
        Ok(None)
    }

    /// Locate and load the file layer, if any
    pub fn load_layer(&self) -> Result<Option<ConfigLayer>, SourceError> {
        self.locate()?.map(|path| load_file_layer(&path)).transpose()
    }
}

/// Parse config file contents
pub fn parse_file_config(
    contents: &str,
    format: FileFormat,
    path: &Path,
) -> Result<PartialConfig, SourceError> {
    let file: FileConfig = match format {
        FileFormat::Toml => toml::from_str(contents).map_err(|source| SourceError::Toml {
            path: path.to_path_buf(),
            source,
        })?,
        FileFormat::Json => serde_json::from_str(contents).map_err(|source| SourceError::Json {
            path: path.to_path_buf(),
            source,
        })?,
    };
    Ok(file.into())
}

/// Read a config file into a layer, recording its digest
pub fn load_file_layer(path: &Path) -> Result<ConfigLayer, SourceError> {
    let bytes = fs::read(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes).map_err(|e| SourceError::InvalidValue {
        key: path.display().to_string(),
        value: "<binary>".to_string(),
        reason: format!("invalid UTF-8: {e}"),
    })?;

    let values = parse_file_config(&contents, FileFormat::from_path(path), path)?;
    info!(path = %path.display(), %digest, "using windward config file");

    Ok(ConfigLayer {
        origin: ConfigOrigin::File,
        path: Some(path.to_path_buf()),
        digest: Some(digest),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_parse_toml() {
        let contents = r#"
            endpoints = ["10.0.0.1:2379", "10.0.0.2:2379"]
            uuid = "prod"
            ca-cert = "/pki/ca.pem"
            cert-file = "/pki/client.pem"
            key-file = "/pki/client-key.pem"
            out = "/etc/etcd/"
            dial-timeout = 10
        "#;
        let values = parse_file_config(contents, FileFormat::Toml, Path::new(".windward")).unwrap();

        assert_eq!(
            values.endpoints,
            Some(vec!["10.0.0.1:2379".to_string(), "10.0.0.2:2379".to_string()])
        );
        assert_eq!(values.uuid.as_deref(), Some("prod"));
        assert_eq!(values.ca_cert.as_deref(), Some("/pki/ca.pem"));
        assert_eq!(values.output.as_deref(), Some("/etc/etcd/"));
        assert_eq!(values.dial_timeout_seconds, Some(10));
    }

    #[test]
    fn test_parse_csv_endpoints_and_ca_file_alias() {
        let contents = r#"
            endpoints = "a:1, b:2"
            ca-file = "/pki/ca.pem"
        "#;
        let values = parse_file_config(contents, FileFormat::Toml, Path::new(".windward")).unwrap();

        assert_eq!(values.endpoints, Some(vec!["a:1".to_string(), "b:2".to_string()]));
        assert_eq!(values.ca_cert.as_deref(), Some("/pki/ca.pem"));
    }

    #[test]
    fn test_parse_json() {
        let contents = r#"{"uuid": "staging", "endpoints": "10.1.0.1:2379"}"#;
        let values = parse_file_config(contents, FileFormat::Json, Path::new(".windward.json")).unwrap();

        assert_eq!(values.uuid.as_deref(), Some("staging"));
        assert_eq!(values.endpoints, Some(vec!["10.1.0.1:2379".to_string()]));
        assert!(values.output.is_none());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = parse_file_config("uiud = \"x\"", FileFormat::Toml, Path::new(".windward"))
            .unwrap_err();
        assert!(matches!(err, SourceError::Toml { .. }));
        assert!(err.to_string().contains(".windward"));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(FileFormat::from_path(Path::new(".windward")), FileFormat::Toml);
        assert_eq!(FileFormat::from_path(Path::new(".windward.toml")), FileFormat::Toml);
        assert_eq!(FileFormat::from_path(Path::new("/x/.windward.JSON")), FileFormat::Json);
    }

    #[test]
    fn test_load_file_layer_records_digest() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "uuid = \"prod\"").unwrap();

        let layer = load_file_layer(temp.path()).unwrap();

        assert_eq!(layer.origin, ConfigOrigin::File);
        assert_eq!(layer.path.as_deref(), Some(temp.path()));
        assert_eq!(layer.digest.as_ref().map(String::len), Some(64));
        assert_eq!(layer.values.uuid.as_deref(), Some("prod"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let search = SearchPaths::with_dirs(Some(PathBuf::from("/nonexistent/.windward")), None, None);
        assert!(matches!(search.locate(), Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_home_searched_before_cwd() {
        let home = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        fs::write(home.path().join(".windward.toml"), "uuid = \"home\"").unwrap();
        fs::write(cwd.path().join(".windward"), "uuid = \"cwd\"").unwrap();

        let search = SearchPaths::with_dirs(
            None,
            Some(home.path().to_path_buf()),
            Some(cwd.path().to_path_buf()),
        );
        let layer = search.load_layer().unwrap().unwrap();
        assert_eq!(layer.values.uuid.as_deref(), Some("home"));
    }

    #[test]
    fn test_explicit_beats_search_dirs() {
        let home = TempDir::new().unwrap();
        fs::write(home.path().join(".windward"), "uuid = \"home\"").unwrap();
        let explicit = home.path().join("custom.json");
        fs::write(&explicit, r#"{"uuid": "explicit"}"#).unwrap();

        let search = SearchPaths::with_dirs(Some(explicit), Some(home.path().to_path_buf()), None);
        let layer = search.load_layer().unwrap().unwrap();
        assert_eq!(layer.values.uuid.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_nothing_found() {
        let empty = TempDir::new().unwrap();
        let search = SearchPaths::with_dirs(None, Some(empty.path().to_path_buf()), None);
        assert!(search.load_layer().unwrap().is_none());
    }
}
