mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{info, warn};
use tracing_subscriber::EnvFilter;

use scr_core::{Filter, Framework, FrameworkConfig, Module, ServiceComponentRuntime};

use crate::cli::{CliError, Manifest};

/// scr: inspect declarative component manifests
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Framework configuration file (JSON, YAML or TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Forward framework DEBUG/INFO diagnostics to the log
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a manifest on stub implementations and print its configurations
    Inspect {
        /// Manifest file: `{ "name": ..., "components": [...] }`
        manifest: PathBuf,
        /// Request every registered service so delayed components activate
        #[arg(long)]
        activate: bool,
    },
    /// Check every component description of a manifest
    Validate {
        manifest: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }
    // Engine diagnostics go through the `log` facade.
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {}", e);
    }
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<FrameworkConfig, CliError> {
    let config = match path {
        Some(path) => FrameworkConfig::from_path(path).map_err(scr_core::Error::from)?,
        None => FrameworkConfig::default(),
    };
    Ok(if verbose { config.with_log_enabled(true) } else { config })
}

/// Get every service the module registered, as the module itself.
fn activate_services(module: &Module) -> Result<(), CliError> {
    let context = module.context()?;
    for reference in context.find(&Filter::any()) {
        if reference.owner() != module.info() {
            continue;
        }
        match context.get_service(&reference) {
            Ok(Some(_)) => info!("Activated service {}", reference.id()),
            Ok(None) => warn!("Service {} produced no object", reference.id()),
            Err(fault) => warn!("Service {} failed to activate: {}", reference.id(), fault),
        }
    }
    Ok(())
}

fn inspect(manifest: &Path, activate: bool, config: FrameworkConfig) -> Result<(), CliError> {
    let manifest = Manifest::load(manifest)?;
    let framework = Framework::new(config);
    framework.start()?;
    let runtime = ServiceComponentRuntime::new(&framework);

    let module = framework.install(manifest.into_descriptor())?;
    module.start()?;
    if activate {
        activate_services(&module)?;
    }

    let mut configurations = runtime.all_configuration_dtos();
    configurations.sort_by(|a, b| (&a.name, &a.configuration_id).cmp(&(&b.name, &b.configuration_id)));
    println!("{}", serde_json::to_string_pretty(&configurations)?);

    runtime.shutdown();
    framework.stop()?;
    Ok(())
}

fn validate(manifest: &Path) -> Result<bool, CliError> {
    let manifest = Manifest::load(manifest)?;
    let problems = manifest.problems();
    if problems.is_empty() {
        println!("{}: {} component(s) OK", manifest.name, manifest.components.len());
        return Ok(true);
    }
    for problem in &problems {
        eprintln!("{}", problem);
    }
    Ok(false)
}

fn run(args: CliArgs) -> Result<bool, CliError> {
    let config = load_config(args.config.as_deref(), args.verbose)?;
    match args.command {
        Commands::Inspect { manifest, activate } => inspect(&manifest, activate, config).map(|()| true),
        Commands::Validate { manifest } => validate(&manifest),
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}
