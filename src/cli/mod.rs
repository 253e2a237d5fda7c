//! CLI module for the pod launcher.
//!
//! This module provides the command-line interface for querying the
//! account and launching pods.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::{CONSOLE_URL, OutputFormatter, format_error};
