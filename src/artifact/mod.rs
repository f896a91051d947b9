//! etcd client configuration artifact
//!
//! Serializes a resolved configuration to disk and reads it back. Two
//! formats are supported: a TOML document (default) and an etcdctl
//! environment file. Writes are atomic (write-then-rename).

mod document;
mod etcdctl;

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::str::FromStr;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::{ResolvedConfig, ValidationError};

pub use document::SCHEMA_VERSION;

/// Artifact serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Toml,
    Env,
}

impl ArtifactFormat {
    /// Infer the format from a destination path (`.env` -> env, else TOML)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("env") => ArtifactFormat::Env,
            _ => ArtifactFormat::Toml,
        }
    }

    /// File name used when the destination is a directory
    pub fn default_file_name(self) -> &'static str {
        match self {
            ArtifactFormat::Toml => "etcd-client.toml",
            ArtifactFormat::Env => "etcd-client.env",
        }
    }
}

impl FromStr for ArtifactFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "toml" => Ok(ArtifactFormat::Toml),
            "env" => Ok(ArtifactFormat::Env),
            other => Err(format!("unknown artifact format '{other}' (expected toml or env)")),
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactFormat::Toml => f.write_str("toml"),
            ArtifactFormat::Env => f.write_str("env"),
        }
    }
}

/// Artifact write errors
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize artifact: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot write {key} to an env artifact: {reason}")]
    Unrepresentable { key: &'static str, reason: String },
}

/// Artifact read errors
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read artifact: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse artifact: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("line {line}: {reason}")]
    Env { line: usize, reason: String },

    #[error("unsupported artifact schema version {0}")]
    UnsupportedSchema(u32),

    #[error("artifact describes an invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

fn is_directory_destination(destination: &Path) -> bool {
    if destination.is_dir() {
        return true;
    }
    let raw = destination.as_os_str().to_string_lossy();
    raw.ends_with('/') || raw.ends_with(MAIN_SEPARATOR)
}

/// Final artifact path for a destination, which may name a directory
pub fn artifact_path(destination: &Path, format: ArtifactFormat) -> PathBuf {
    if is_directory_destination(destination) {
        destination.join(format.default_file_name())
    } else {
        destination.to_path_buf()
    }
}

/// Render a resolved configuration in the given format
pub fn render(config: &ResolvedConfig, format: ArtifactFormat) -> Result<String, EmitError> {
    let now = Utc::now();
    Ok(match format {
        ArtifactFormat::Toml => document::render(config, now)?,
        ArtifactFormat::Env => etcdctl::render(config, now)?,
    })
}

/// Write the artifact for `config` to `destination`.
///
/// The format defaults to the one implied by the destination. Returns the
/// path actually written.
pub fn emit(
    config: &ResolvedConfig,
    destination: &Path,
    format: Option<ArtifactFormat>,
) -> Result<PathBuf, EmitError> {
    let format = format.unwrap_or_else(|| ArtifactFormat::from_path(destination));
    let path = artifact_path(destination, format);
    let body = render(config, format)?;

    write_atomic(&path, body.as_bytes()).map_err(|source| EmitError::Io {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), %format, "wrote etcd client configuration");
    Ok(path)
}

/// Write to a uniquely named sibling temp file, then rename it over the
/// destination. The temp file is removed if any step fails.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name")
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut prefix = OsString::from(".");
    prefix.push(file_name);
    prefix.push(".");

    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    debug!(path = %temp.path().display(), "writing temp file");
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read an artifact back. The format follows the path.
pub fn read_artifact(path: &Path) -> Result<ResolvedConfig, ArtifactError> {
    read_artifact_as(path, ArtifactFormat::from_path(path))
}

/// Read an artifact in an explicit format
pub fn read_artifact_as(path: &Path, format: ArtifactFormat) -> Result<ResolvedConfig, ArtifactError> {
    let contents = fs::read_to_string(path)?;
    match format {
        ArtifactFormat::Toml => document::parse(&contents),
        ArtifactFormat::Env => etcdctl::parse(&contents),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PartialConfig;
    use tempfile::TempDir;

    fn sample() -> ResolvedConfig {
        ResolvedConfig::validate(
            PartialConfig {
                endpoints: Some(vec!["10.0.0.1:2379".to_string()]),
                uuid: Some("prod".to_string()),
                ..Default::default()
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ArtifactFormat::from_path(Path::new("/etc/etcd.env")), ArtifactFormat::Env);
        assert_eq!(ArtifactFormat::from_path(Path::new("/etc/etcd.toml")), ArtifactFormat::Toml);
        assert_eq!(ArtifactFormat::from_path(Path::new("/etc/etcd")), ArtifactFormat::Toml);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("ENV".parse::<ArtifactFormat>(), Ok(ArtifactFormat::Env));
        assert_eq!("toml".parse::<ArtifactFormat>(), Ok(ArtifactFormat::Toml));
        assert!("yaml".parse::<ArtifactFormat>().is_err());
    }

    #[test]
    fn test_artifact_path_for_directory() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            artifact_path(dir.path(), ArtifactFormat::Toml),
            dir.path().join("etcd-client.toml")
        );
        assert_eq!(
            artifact_path(Path::new("/not/yet/there/"), ArtifactFormat::Env),
            PathBuf::from("/not/yet/there/etcd-client.env")
        );
        assert_eq!(
            artifact_path(Path::new("/etc/etcd.toml"), ArtifactFormat::Toml),
            PathBuf::from("/etc/etcd.toml")
        );
    }

    #[test]
    fn test_emit_into_directory() {
        let dir = TempDir::new().unwrap();
        let written = emit(&sample(), dir.path(), None).unwrap();

        assert_eq!(written, dir.path().join("etcd-client.toml"));
        assert_eq!(read_artifact(&written).unwrap(), sample());
    }

    #[test]
    fn test_emit_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("client.toml");
        fs::write(&dest, "stale").unwrap();

        emit(&sample(), &dest, None).unwrap();

        assert!(fs::read_to_string(&dest).unwrap().contains("uuid = \"prod\""));
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_emit_failure_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("missing-subdir").join("client.toml");

        let err = emit(&sample(), &dest, None).unwrap_err();

        assert!(matches!(err, EmitError::Io { .. }));
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_concurrent_emits_never_expose_partial_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("client.toml");

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| emit(&sample(), &dest, None).unwrap());
            }
        });

        assert_eq!(read_artifact(&dest).unwrap(), sample());
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("client.toml")]);
    }

    #[test]
    fn test_explicit_format_overrides_extension() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("client.conf");

        emit(&sample(), &dest, Some(ArtifactFormat::Env)).unwrap();

        assert!(fs::read_to_string(&dest).unwrap().contains("ETCDCTL_ENDPOINTS=10.0.0.1:2379"));
        assert_eq!(read_artifact_as(&dest, ArtifactFormat::Env).unwrap(), sample());
    }
}
