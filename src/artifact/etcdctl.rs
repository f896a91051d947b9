//! etcdctl environment artifact
//!
//! One `KEY=value` assignment per line, using the variables `etcdctl` reads
//! (`ETCDCTL_ENDPOINTS`, `ETCDCTL_CACERT`, ...). windward-only values use
//! the `WINDWARD_ARTIFACT_` prefix, which the environment layer never reads,
//! so sourcing the file does not feed back into the next run. Values that
//! are not shell-safe are single-quoted; line breaks cannot be represented.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use super::{ArtifactError, EmitError};
use crate::config::{PartialConfig, ResolvedConfig};

const ENDPOINTS: &str = "ETCDCTL_ENDPOINTS";
const DIAL_TIMEOUT: &str = "ETCDCTL_DIAL_TIMEOUT";
const CACERT: &str = "ETCDCTL_CACERT";
const CERT: &str = "ETCDCTL_CERT";
const KEY: &str = "ETCDCTL_KEY";
const UUID: &str = "WINDWARD_ARTIFACT_UUID";
const INPUT: &str = "WINDWARD_ARTIFACT_IN";
const OUTPUT: &str = "WINDWARD_ARTIFACT_OUT";

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_./:,@%+=-".contains(c)
}

fn quote(value: &str) -> String {
    if !value.is_empty() && value.chars().all(is_shell_safe) {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

fn unquote(raw: &str, line: usize) -> Result<String, ArtifactError> {
    let mut out = String::new();
    let mut rest = raw;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('\'') {
            let end = after.find('\'').ok_or_else(|| ArtifactError::Env {
                line,
                reason: "unterminated quote".to_string(),
            })?;
            out.push_str(&after[..end]);
            rest = &after[end + 1..];
        } else if let Some(after) = rest.strip_prefix("\\'") {
            out.push('\'');
            rest = after;
        } else {
            let end = rest.find(|c: char| c == '\'' || c == '\\').unwrap_or(rest.len());
            if end == 0 {
                return Err(ArtifactError::Env {
                    line,
                    reason: "stray backslash".to_string(),
                });
            }
            out.push_str(&rest[..end]);
            rest = &rest[end..];
        }
    }
    Ok(out)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Render a resolved configuration as etcdctl environment assignments.
///
/// Fails if a value contains a line break.
pub fn render(config: &ResolvedConfig, generated_at: DateTime<Utc>) -> Result<String, EmitError> {
    let mut vars = vec![
        (ENDPOINTS, config.endpoint_strings().join(",")),
        (DIAL_TIMEOUT, format!("{}s", config.dial_timeout().as_secs())),
    ];
    if let Some(tls) = config.tls() {
        vars.push((CACERT, path_string(&tls.ca_cert)));
        vars.push((CERT, path_string(&tls.cert_file)));
        vars.push((KEY, path_string(&tls.key_file)));
    }
    vars.push((UUID, config.uuid().to_string()));
    if let Some(input) = config.input() {
        vars.push((INPUT, path_string(input)));
    }
    if let Some(output) = config.output() {
        vars.push((OUTPUT, path_string(output)));
    }

    let mut body = format!(
        "# generated by windward at {}\n",
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    for (key, value) in vars {
        if value.contains(|c: char| c == '\n' || c == '\r') {
            return Err(EmitError::Unrepresentable {
                key,
                reason: "value contains a line break".to_string(),
            });
        }
        body.push_str(&format!("{key}={}\n", quote(&value)));
    }
    Ok(body)
}

/// Parse an etcdctl environment artifact back into a resolved configuration
pub fn parse(contents: &str) -> Result<ResolvedConfig, ArtifactError> {
    let mut values = PartialConfig::default();
    let mut input = None;

    for (idx, raw_line) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (key, raw_value) = line.split_once('=').ok_or_else(|| ArtifactError::Env {
            line: line_no,
            reason: "expected KEY=value".to_string(),
        })?;
        let value = unquote(raw_value, line_no)?;

        match key {
            ENDPOINTS => values.endpoints = Some(value.split(',').map(str::to_string).collect()),
            DIAL_TIMEOUT => {
                let secs = value
                    .strip_suffix('s')
                    .unwrap_or(&value)
                    .parse::<u64>()
                    .map_err(|e| ArtifactError::Env {
                        line: line_no,
                        reason: format!("invalid {DIAL_TIMEOUT} '{value}': {e}"),
                    })?;
                values.dial_timeout_seconds = Some(secs);
            }
            CACERT => values.ca_cert = Some(value),
            CERT => values.cert_file = Some(value),
            KEY => values.key_file = Some(value),
            UUID => values.uuid = Some(value),
            INPUT => input = Some(PathBuf::from(value)),
            OUTPUT => values.output = Some(value),
            other => {
                return Err(ArtifactError::Env {
                    line: line_no,
                    reason: format!("unknown variable '{other}'"),
                })
            }
        }
    }

    Ok(ResolvedConfig::validate(values, input)?)
}
