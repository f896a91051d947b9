//! Pipeline orchestration
//!
//! resolve -> connect -> verify (advisory) -> emit (optional). Every fatal
//! failure is tagged with the stage that produced it.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::artifact::{emit, ArtifactFormat, EmitError};
use crate::client::{ClusterClient, ConnectionError};
use crate::config::{resolve_traced, ConfigLayer, Provenance, ResolvedConfig, SourceError, ValidationError};
use crate::reachability::{Reachable, UnreachableError};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source stage failed: {0}")]
    Source(#[from] SourceError),

    #[error("resolve stage failed: {0}")]
    Resolve(#[from] ValidationError),

    #[error("connect stage failed: {0}")]
    Connect(#[from] ConnectionError),

    #[error("emit stage failed: {0}")]
    Emit(#[from] EmitError),
}

/// Pipeline switches
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Skip the reachability check
    pub skip_verify: bool,

    /// Artifact format; inferred from the destination when unset
    pub format: Option<ArtifactFormat>,
}

/// Outcome of the reachability step
#[derive(Debug, Clone)]
pub enum Reachability {
    Skipped,
    Reachable(Reachable),
    Unreachable(UnreachableError),
}

/// What a pipeline run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub config: ResolvedConfig,
    pub provenance: Provenance,
    pub reachability: Reachability,

    /// Artifact path, when one was written
    pub written: Option<PathBuf>,
}

/// Run the full pipeline over already-gathered layers
pub fn run(layers: &[ConfigLayer], options: &PipelineOptions) -> Result<RunReport, PipelineError> {
    let resolution = resolve_traced(layers)?;
    for source in &resolution.sources {
        debug!(
            origin = ?source.origin,
            path = ?source.path,
            digest = ?source.digest,
            "config source"
        );
    }

    let reachability = {
        let client = ClusterClient::connect(&resolution.config)?;
        if options.skip_verify {
            Reachability::Skipped
        } else {
            match client.verify_reachability() {
                Ok(reachable) => {
                    info!(endpoint = %reachable.endpoint, "cluster reachable");
                    Reachability::Reachable(reachable)
                }
                Err(unreachable) => {
                    warn!(error = %unreachable, "cluster not reachable, continuing");
                    Reachability::Unreachable(unreachable)
                }
            }
        }
    };

    let written = match resolution.emit_destination() {
        Some(destination) => Some(emit(&resolution.config, destination, options.format)?),
        None => {
            info!(
                uuid = resolution.config.uuid(),
                endpoints = ?resolution.config.endpoint_strings(),
                "no output requested, configuration used in-process only"
            );
            None
        }
    };

    Ok(RunReport {
        config: resolution.config,
        provenance: resolution.provenance,
        reachability,
        written,
    })
}
