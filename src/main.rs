//! windward CLI
//!
//! Entry point for the `windward` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::info;
use windward::config::{gather_layers, BuiltinDefaults, EnvSource, PartialConfig, SearchPaths};
use windward::endpoint::split_list;
use windward::logging::{self, LogOptions};
use windward::pipeline::{self, PipelineError, PipelineOptions};
use windward::ArtifactFormat;

#[derive(Parser)]
#[command(name = "windward")]
#[command(about = "Determine etcd environment for new or existing cluster", version)]
struct Cli {
    /// windward config filename
    #[arg(long = "in", short = 'i')]
    input: Option<PathBuf>,

    /// etcd config filename, or a directory to write etcd-client.toml into
    #[arg(long, short = 'o')]
    out: Option<String>,

    /// Comma-separated cluster endpoints (host:port)
    #[arg(long, short = 'e')]
    endpoints: Option<String>,

    /// Certificate authority filename
    #[arg(long = "ca-file", short = 'a')]
    ca_file: Option<String>,

    /// Client certificate filename
    #[arg(long = "cert-file", short = 'c')]
    cert_file: Option<String>,

    /// Client key filename
    #[arg(long = "key-file", short = 'k')]
    key_file: Option<String>,

    /// etcd cluster uuid
    #[arg(long, short = 'u')]
    uuid: Option<String>,

    /// Dial timeout in seconds for the reachability check
    #[arg(long = "dial-timeout", value_name = "SECONDS")]
    dial_timeout: Option<u64>,

    /// Default the TLS triple to the /etcd/etcd/ssl client files
    #[arg(long)]
    tls_defaults: bool,

    /// Skip the reachability check
    #[arg(long)]
    no_verify: bool,

    /// Artifact format (toml or env); inferred from --out when omitted
    #[arg(long)]
    format: Option<ArtifactFormat>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn flags(&self) -> PartialConfig {
        PartialConfig {
            output: self.out.clone(),
            endpoints: self.endpoints.as_deref().map(split_list),
            uuid: self.uuid.clone(),
            ca_cert: self.ca_file.clone(),
            cert_file: self.cert_file.clone(),
            key_file: self.key_file.clone(),
            dial_timeout_seconds: self.dial_timeout,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(LogOptions {
        verbose: cli.verbose,
        json: cli.log_json,
    });

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), PipelineError> {
    let env = EnvSource::from_process();
    let search = SearchPaths::discover(cli.input.clone().or_else(|| env.config_path()));
    let defaults = if cli.tls_defaults {
        BuiltinDefaults::default().with_conventional_tls()
    } else {
        BuiltinDefaults::default()
    };

    let layers = gather_layers(&defaults, &search, &env, cli.flags())?;
    let report = pipeline::run(
        &layers,
        &PipelineOptions {
            skip_verify: cli.no_verify,
            format: cli.format,
        },
    )?;

    if let Some(path) = &report.written {
        info!(path = %path.display(), uuid = report.config.uuid(), "done");
    }
    Ok(())
}
