//! runpod-launch CLI entrypoint.
//!
//! This is the main entrypoint for the runpod-launch command-line tool.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use runpod_launch::cli::{Cli, Commands, OutputFormatter, format_error};
use runpod_launch::config::{
    ConfigParser, ConfigValidator, Credentials, LaunchConfig, ResolvedPaths, read_public_key,
};
use runpod_launch::error::Result;
use runpod_launch::runpod::{Inventory, RunPodClient, compare_keys};
use runpod_launch::ssh::SystemRunner;
use runpod_launch::workflow::{Launcher, until_interrupted};

use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprint!("{}", format_error(&e));
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Main async entry point. Ctrl-C ends any command.
async fn run(cli: Cli) -> Result<()> {
    until_interrupted(dispatch(cli), tokio::signal::ctrl_c()).await
}

/// Runs the selected command.
async fn dispatch(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let paths = config.paths.resolve()?;
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Volumes => cmd_volumes(&config, &paths, &formatter).await,
        Commands::SshKey => cmd_ssh_key(&config, &paths, &formatter).await,
        Commands::Launch { name, no_editor } => {
            cmd_launch(config, &paths, name, no_editor, &formatter).await
        }
    }
}

/// List network volumes.
async fn cmd_volumes(
    config: &LaunchConfig,
    paths: &ResolvedPaths,
    formatter: &OutputFormatter,
) -> Result<()> {
    let credentials = Credentials::load_api_key_only(&paths.api_key_file)?;
    let inventory = Inventory::new(RunPodClient::new(&credentials.api_key, &config.api)?);

    let volumes = inventory.list_network_volumes().await?;
    println!("{}", formatter.format_volumes(&volumes));

    Ok(())
}

/// Show the account SSH key.
async fn cmd_ssh_key(
    config: &LaunchConfig,
    paths: &ResolvedPaths,
    formatter: &OutputFormatter,
) -> Result<()> {
    let credentials = Credentials::load_api_key_only(&paths.api_key_file)?;
    let inventory = Inventory::new(RunPodClient::new(&credentials.api_key, &config.api)?);

    let key = inventory.fetch_public_key().await?;
    let comparison = key.as_deref().map(|account| {
        let local = read_public_key(&paths.runpodctl_public_key);
        compare_keys(account, local.as_deref())
    });

    println!("{}", formatter.format_public_key(key.as_deref(), comparison));
    Ok(())
}

/// Launch a pod.
async fn cmd_launch(
    mut config: LaunchConfig,
    paths: &ResolvedPaths,
    name: Option<String>,
    no_editor: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    if no_editor {
        config.editor.enabled = false;
    }

    let credentials = Credentials::load(&paths.api_key_file, &paths.ssh_public_key)?;
    let launcher = Launcher::new(&config, paths, &credentials, Arc::new(SystemRunner))?;

    let outcome = match name.as_deref() {
        Some(name) => launcher.run_named(name).await?,
        None => launcher.run().await?,
    };

    println!("{}", formatter.format_launch(&outcome, &paths.ssh_private_key));
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Loads `.env`, the configuration and validates it.
fn load_config(config_path: Option<&Path>) -> Result<LaunchConfig> {
    let base = config_path
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let parser = ConfigParser::new().with_base_path(base);
    parser.load_dotenv()?;

    let config = parser.load(config_path)?;
    debug!("Loaded configuration: {config:?}");

    let result = ConfigValidator::new().validate(&config)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }

    Ok(config)
}
