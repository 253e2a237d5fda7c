//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// runpod-launch - Start a `RunPod` GPU pod and open it in your editor.
#[derive(Parser, Debug)]
#[command(name = "runpod-launch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "RUNPOD_LAUNCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List the network volumes on the account.
    Volumes,

    /// Show the SSH public key registered on the account.
    SshKey,

    /// Deploy a pod, wait for SSH and open the editor.
    Launch {
        /// Pod name (defaults to `<name_prefix>-<timestamp>`).
        #[arg(short, long)]
        name: Option<String>,

        /// Do not launch the editor.
        #[arg(long)]
        no_editor: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}
