//! windward - determine the etcd environment for a new or existing cluster
//!
//! Folds layered configuration (defaults, `.windward` file, `WINDWARD_*`
//! environment, flags) into one validated record, checks that the cluster
//! is reachable, and writes an etcd client configuration artifact.

pub mod artifact;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod logging;
pub mod pipeline;
pub mod reachability;

pub use artifact::{emit, read_artifact, ArtifactFormat};
pub use client::ClusterClient;
pub use config::{resolve, ConfigLayer, ConfigOrigin, PartialConfig, ResolvedConfig};
pub use endpoint::Endpoint;
pub use pipeline::{PipelineError, PipelineOptions, RunReport};
pub use reachability::verify_reachability;
