//! batchfleet CLI
//!
//! Entry point for the `batchfleet` command-line tool.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use batchfleet::config::{default_host_config_path, deep_merge, BuiltinDefaults, Configuration};
use batchfleet::deploy::{load_manifest, DeployError, DeploymentFacade};
use batchfleet::fleet::{ClusterFleetManager, FleetTarget};
use batchfleet::host::{GcloudClusterApi, KubectlJobApi, SystemRunner};
use batchfleet::summary::{BatchReport, ExitCode};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "batchfleet")]
#[command(about = "Run a dataset manifest as Kubernetes jobs across a GKE fleet", version)]
struct Cli {
    /// Host config file (default: ~/.config/batchfleet/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pre-pull the worker image on every node
    Prepare {
        #[command(flatten)]
        target: TargetArgs,

        /// Worker image to pull
        #[arg(long)]
        image: Option<String>,
    },

    /// Submit one job per selected dataset
    Submit(SubmitArgs),

    /// Print one status snapshot
    Status {
        #[command(flatten)]
        target: TargetArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print a status snapshot every interval until interrupted
    Watch {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Delete every managed job and the pre-pull DaemonSet
    Cleanup {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Create one cluster per manifest entry
    Clusters(FleetArgs),

    /// Delete the clusters of a manifest
    ClustersDelete(FleetArgs),
}

#[derive(Args)]
struct TargetArgs {
    /// Kubernetes namespace
    #[arg(long)]
    namespace: Option<String>,

    /// Page size for job listings
    #[arg(long)]
    limit: Option<u32>,

    /// kubectl context (default: current context)
    #[arg(long)]
    cluster: Option<String>,
}

impl TargetArgs {
    fn overrides(&self) -> Value {
        json!({
            "namespace": self.namespace,
            "limit": self.limit,
            "cluster": self.cluster,
        })
    }
}

#[derive(Args)]
struct SubmitArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Run label; jobs are named `{run}-{index}`
    #[arg(long)]
    run: String,

    /// Glob over dataset names, or the single dataset to process without a mapping
    #[arg(long)]
    dataset_pattern: Option<String>,

    /// JSON dataset manifest
    #[arg(long)]
    dataset_mapping: Option<PathBuf>,

    /// Submit only this manifest entry
    #[arg(long)]
    dataset_index: Option<usize>,

    #[arg(long)]
    image: Option<String>,

    #[arg(long)]
    access_key: Option<String>,

    #[arg(long)]
    secret_key: Option<String>,

    /// s3 or gcs
    #[arg(long)]
    storage_type: Option<String>,

    #[arg(long)]
    storage_host: Option<String>,

    /// Input bucket
    #[arg(long)]
    bucket: Option<String>,

    #[arg(long)]
    output_bucket: Option<String>,

    /// CPU request and limit per job, e.g. 900m
    #[arg(long)]
    cpu_limit: Option<String>,

    /// Pod retries before a job is marked failed
    #[arg(long)]
    backoff_limit: Option<u32>,

    /// Parallel transfer threads for mc
    #[arg(long)]
    mc_threads: Option<u32>,

    #[arg(long)]
    output_file: Option<String>,

    #[arg(long)]
    output_json_file: Option<String>,

    #[arg(long)]
    download_max_kb: Option<u64>,

    #[arg(long)]
    upload_max_kb: Option<u64>,

    #[arg(long)]
    redis_host: Option<String>,

    #[arg(long)]
    gcs_project_id: Option<String>,
}

impl SubmitArgs {
    fn overrides(&self) -> Value {
        deep_merge(
            self.target.overrides(),
            json!({
                "run": self.run,
                "image": self.image,
                "cpu_limit": self.cpu_limit,
                "backoff_limit": self.backoff_limit,
                "storage": {
                    "type": self.storage_type,
                    "host": self.storage_host,
                    "access_key": self.access_key,
                    "secret_key": self.secret_key,
                    "bucket": self.bucket,
                    "output_bucket": self.output_bucket,
                    "multipart_threads": self.mc_threads,
                    "download_max_kb": self.download_max_kb,
                    "upload_max_kb": self.upload_max_kb,
                },
                "output": {
                    "file": self.output_file,
                    "json_file": self.output_json_file,
                },
                "redis_host": self.redis_host,
                "gcp": {"project_id": self.gcs_project_id},
                "dataset": {
                    "mapping": self.dataset_mapping,
                    "pattern": self.dataset_pattern,
                    "index": self.dataset_index,
                },
            }),
        )
    }
}

#[derive(Args)]
struct FleetArgs {
    /// JSON dataset manifest with flavor and nodes per entry
    #[arg(long)]
    dataset_mapping: PathBuf,

    #[arg(long)]
    gcs_project_id: Option<String>,

    #[arg(long)]
    gcs_region: Option<String>,

    /// Cluster name prefix; clusters are named `{prefix}{index}`
    #[arg(long)]
    prefix: Option<String>,
}

impl FleetArgs {
    fn overrides(&self) -> Value {
        json!({
            "gcp": {
                "project_id": self.gcs_project_id,
                "region": self.gcs_region,
                "cluster_prefix": self.prefix,
            }
        })
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    process::exit(code.as_i32());
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(
    cli: &Cli,
    defaults: &BuiltinDefaults,
    overrides: Value,
) -> Result<Configuration, DeployError> {
    let host_path = cli.config.clone().or_else(default_host_config_path);
    Ok(Configuration::load(defaults, host_path.as_deref(), Some(overrides))?)
}

fn facade(config: Configuration) -> DeploymentFacade {
    let api = KubectlJobApi::new(Arc::new(SystemRunner), config.cluster.clone());
    DeploymentFacade::new(config, Arc::new(api))
}

fn run(cli: &Cli) -> Result<ExitCode, DeployError> {
    match cli.command {
        Commands::Prepare { ref target, ref image } => {
            let overrides = deep_merge(target.overrides(), json!({ "image": image }));
            let config = load_config(cli, &BuiltinDefaults::default(), overrides)?;
            facade(config).prepare()?;
            emit(&mut io::stdout().lock(), "prepare: pre-pull DaemonSet applied")?;
            Ok(ExitCode::Success)
        }
        Commands::Submit(ref args) => {
            let config = load_config(cli, &BuiltinDefaults::for_submit(), args.overrides())?;
            report(&facade(config).submit()?)
        }
        Commands::Status { ref target, json } => {
            let config = load_config(cli, &BuiltinDefaults::default(), target.overrides())?;
            let snapshot = facade(config).status()?;
            let rendered = if json {
                serde_json::to_string_pretty(&snapshot)
                    .map_err(|e| DeployError::Output(io::Error::new(io::ErrorKind::InvalidData, e)))?
            } else {
                snapshot.to_string()
            };
            emit(&mut io::stdout().lock(), &rendered)?;
            Ok(ExitCode::Success)
        }
        Commands::Watch { ref target } => {
            let config = load_config(cli, &BuiltinDefaults::default(), target.overrides())?;
            let stdout = io::stdout();
            facade(config).watch(|tick| {
                let mut out = stdout.lock();
                writeln!(out, "{}", tick.line())?;
                out.flush()
            })?;
            Ok(ExitCode::Success)
        }
        Commands::Cleanup { ref target } => {
            let config = load_config(cli, &BuiltinDefaults::default(), target.overrides())?;
            report(&facade(config).cleanup()?)
        }
        Commands::Clusters(ref args) => {
            let (manager, manifest, fleet) = fleet_setup(cli, args)?;
            report(&manager.create_fleet(&manifest, &fleet)?)
        }
        Commands::ClustersDelete(ref args) => {
            let (manager, manifest, fleet) = fleet_setup(cli, args)?;
            report(&manager.delete_fleet(&manifest, &fleet))
        }
    }
}

fn fleet_setup(
    cli: &Cli,
    args: &FleetArgs,
) -> Result<(ClusterFleetManager, batchfleet_manifest::DatasetManifest, FleetTarget), DeployError> {
    let config = load_config(cli, &BuiltinDefaults::default(), args.overrides())?;
    let manifest = load_manifest(&args.dataset_mapping)?;
    let target = FleetTarget {
        project: config.gcp.project_id,
        region: config.gcp.region,
        prefix: config.gcp.cluster_prefix,
    };
    let manager = ClusterFleetManager::new(Arc::new(GcloudClusterApi::new(Arc::new(SystemRunner))));
    Ok((manager, manifest, target))
}

fn report(report: &BatchReport) -> Result<ExitCode, DeployError> {
    emit(&mut io::stdout().lock(), &report.human_summary())?;
    for failure in report.failures() {
        if let Some(ref e) = failure.error {
            eprintln!("  {}: {}", failure.name, e);
        }
    }
    Ok(report.exit_code())
}

/// Write one line of command output. A closed pipe surfaces as an error
/// instead of a panic.
fn emit(out: &mut impl Write, text: &str) -> Result<(), DeployError> {
    writeln!(out, "{}", text)
        .and_then(|()| out.flush())
        .map_err(DeployError::Output)
}
