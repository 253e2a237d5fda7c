//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use std::path::Path;
use tabled::{Table, Tabled};

use crate::error::LaunchError;
use crate::runpod::{KeyMatch, NetworkVolume};
use crate::ssh::manual_ssh_command;
use crate::workflow::LaunchOutcome;

use super::commands::OutputFormat;

/// Console page for managing pods.
pub const CONSOLE_URL: &str = "https://runpod.io/console/pods";

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Network volume row for table display.
#[derive(Tabled)]
struct VolumeRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Size (GB)")]
    size: u64,
    #[tabled(rename = "Datacenter")]
    data_center: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the account's network volumes.
    #[must_use]
    pub fn format_volumes(&self, volumes: &[NetworkVolume]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(volumes).unwrap_or_default(),
            OutputFormat::Text => Self::format_volumes_text(volumes),
        }
    }

    fn format_volumes_text(volumes: &[NetworkVolume]) -> String {
        if volumes.is_empty() {
            return String::from("No network volumes found.\n");
        }

        let rows: Vec<VolumeRow> = volumes
            .iter()
            .map(|v| VolumeRow {
                name: v.name.clone(),
                id: v.id.clone(),
                size: v.size,
                data_center: v.data_center_id.clone(),
            })
            .collect();

        let mut output = format!("\n{}\n", "Network Volumes".bold());
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');
        output
    }

    /// Formats the account's SSH public key and how it compares to the
    /// local `runpodctl` key.
    #[must_use]
    pub fn format_public_key(&self, key: Option<&str>, comparison: Option<KeyMatch>) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "public_key": key,
                "runpodctl_key": comparison.map(Self::key_match_label),
            }))
            .unwrap_or_default(),
            OutputFormat::Text => Self::format_public_key_text(key, comparison),
        }
    }

    fn format_public_key_text(key: Option<&str>, comparison: Option<KeyMatch>) -> String {
        let Some(key) = key else {
            return String::from("No SSH key found\n");
        };

        let mut output = format!("{key}\n");
        match comparison {
            Some(KeyMatch::Matches) => {
                let _ = writeln!(output, "{} Matches the local runpodctl key", "✓".green());
            }
            Some(KeyMatch::Differs) => {
                let _ = writeln!(
                    output,
                    "{} Differs from the local runpodctl key",
                    "⚠".yellow()
                );
            }
            Some(KeyMatch::NoLocalKey) => {
                let _ = writeln!(output, "{} No local runpodctl key to compare", "-".dimmed());
            }
            None => {}
        }
        output
    }

    const fn key_match_label(comparison: KeyMatch) -> &'static str {
        match comparison {
            KeyMatch::Matches => "matches",
            KeyMatch::Differs => "differs",
            KeyMatch::NoLocalKey => "missing",
        }
    }

    /// Formats the summary of a finished launch.
    #[must_use]
    pub fn format_launch(&self, outcome: &LaunchOutcome, identity_file: &Path) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(outcome).unwrap_or_default(),
            OutputFormat::Text => Self::format_launch_text(outcome, identity_file),
        }
    }

    fn format_launch_text(outcome: &LaunchOutcome, identity_file: &Path) -> String {
        let mut output = String::new();

        let _ = writeln!(
            output,
            "\n{} Pod {} ({}) is ready",
            "✓".green(),
            outcome.pod_name.bold(),
            outcome.pod_id
        );
        let _ = writeln!(output, "   Cost: ${:.3}/hr", outcome.cost_per_hr);
        let manual = manual_ssh_command(&outcome.host, outcome.port, identity_file);
        let _ = writeln!(output, "\nConnect with:");
        match &outcome.alias {
            Some(alias) => {
                let _ = writeln!(output, "   ssh {}", alias.cyan());
            }
            None => {
                let _ = writeln!(
                    output,
                    "   {} SSH config entry was not written; use the explicit command",
                    "⚠".yellow()
                );
            }
        }
        let _ = writeln!(output, "   {manual}");

        if !outcome.known_host_added {
            let _ = writeln!(
                output,
                "\n{} Host key was not recorded; ssh may ask to confirm it",
                "⚠".yellow()
            );
        }
        if outcome.alias.is_some() && !outcome.editor_launched {
            let _ = writeln!(output, "{} Editor was not started", "-".dimmed());
        }
        if !outcome.ssh_verified {
            let _ = writeln!(
                output,
                "{} SSH test connection failed; the pod may still be starting",
                "⚠".yellow()
            );
        }

        let _ = writeln!(
            output,
            "\n{} The pod is billed until stopped: {CONSOLE_URL}",
            "!".red().bold()
        );
        output
    }
}

/// Formats a fatal error for the terminal. A pod left running is always
/// named, with a timeout getting its own message.
#[must_use]
pub fn format_error(error: &LaunchError) -> String {
    let mut output = format!("{} {error}\n", "Error:".red().bold());

    if let Some(pod_id) = error.pod_id() {
        if error.is_timeout() {
            let _ = writeln!(
                output,
                "Timed out waiting for pod {pod_id} to expose SSH."
            );
        }
        let _ = writeln!(
            output,
            "Pod {pod_id} is still running and billed; stop it at {CONSOLE_URL}"
        );
    }
    output
}
