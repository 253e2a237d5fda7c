//! Local SSH registration of a new pod.
//!
//! Both files are append-only: entries are added, never rewritten or removed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::runpod::SshEndpoint;

use super::runner::CommandRunner;

/// Prefix of the SSH alias given to every pod.
pub const ALIAS_PREFIX: &str = "runpod-";

/// Remote user on `RunPod` templates.
pub const SSH_USER: &str = "root";

/// Returns the SSH alias of a pod.
#[must_use]
pub fn ssh_alias(pod_id: &str) -> String {
    format!("{ALIAS_PREFIX}{pod_id}")
}

/// Returns the explicit `ssh` command for a pod, usable without the alias.
#[must_use]
pub fn manual_ssh_command(host: &str, port: u16, identity_file: &Path) -> String {
    format!("ssh {SSH_USER}@{host} -p {port} -i {}", identity_file.display())
}

/// A host block for the SSH client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshConfigEntry {
    /// Host alias.
    pub alias: String,
    /// Pod name, written as a comment above the block.
    pub pod_name: String,
    /// Host or IP address.
    pub host_name: String,
    /// Port.
    pub port: u16,
    /// Remote user.
    pub user: String,
    /// Private key file.
    pub identity_file: PathBuf,
}

impl SshConfigEntry {
    /// Builds the entry for a pod.
    #[must_use]
    pub fn for_pod(pod_id: &str, pod_name: &str, endpoint: &SshEndpoint, identity_file: &Path) -> Self {
        Self {
            alias: ssh_alias(pod_id),
            pod_name: pod_name.to_string(),
            host_name: endpoint.host.clone(),
            port: endpoint.port,
            user: String::from(SSH_USER),
            identity_file: identity_file.to_path_buf(),
        }
    }

    /// Renders the block, preceded by a blank line so it never merges with
    /// the previous entry. Host key checking is off for this host only.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "\n# RunPod Pod: {}\nHost {}\n    HostName {}\n    Port {}\n    User {}\n    IdentityFile {}\n    StrictHostKeyChecking no\n",
            self.pod_name,
            self.alias,
            self.host_name,
            self.port,
            self.user,
            self.identity_file.display()
        )
    }
}

/// Writes known-hosts and SSH config entries for new pods.
pub struct ConnectionRegistrar {
    runner: Arc<dyn CommandRunner>,
    known_hosts: PathBuf,
    ssh_config: PathBuf,
    identity_file: PathBuf,
    keyscan_timeout: Duration,
}

impl std::fmt::Debug for ConnectionRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistrar")
            .field("known_hosts", &self.known_hosts)
            .field("ssh_config", &self.ssh_config)
            .field("identity_file", &self.identity_file)
            .field("keyscan_timeout", &self.keyscan_timeout)
            .finish_non_exhaustive()
    }
}

impl ConnectionRegistrar {
    /// Creates a registrar writing to the given files.
    #[must_use]
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        known_hosts: impl Into<PathBuf>,
        ssh_config: impl Into<PathBuf>,
        identity_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            known_hosts: known_hosts.into(),
            ssh_config: ssh_config.into(),
            identity_file: identity_file.into(),
            keyscan_timeout: Duration::from_secs(10),
        }
    }

    /// Sets the `ssh-keyscan` timeout.
    #[must_use]
    pub const fn with_keyscan_timeout(mut self, timeout: Duration) -> Self {
        self.keyscan_timeout = timeout;
        self
    }

    /// Returns the explicit `ssh` command for an endpoint.
    #[must_use]
    pub fn manual_command(&self, endpoint: &SshEndpoint) -> String {
        manual_ssh_command(&endpoint.host, endpoint.port, &self.identity_file)
    }

    /// Scans the pod's host key and appends it to known-hosts.
    ///
    /// Never fails: a missing entry only means an interactive prompt later.
    /// Returns whether an entry was written.
    pub async fn add_known_host(&self, endpoint: &SshEndpoint) -> bool {
        info!("Adding {endpoint} to {}", self.known_hosts.display());

        let args = vec![
            String::from("-p"),
            endpoint.port.to_string(),
            String::from("-H"),
            endpoint.host.clone(),
        ];

        let output = match self.runner.run("ssh-keyscan", &args, self.keyscan_timeout).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Could not run ssh-keyscan ({e}), continuing");
                return false;
            }
        };

        if !output.success || output.stdout.trim().is_empty() {
            warn!(
                "ssh-keyscan returned no keys (exit code {:?}), continuing",
                output.exit_code
            );
            return false;
        }

        match append(&self.known_hosts, &output.stdout).await {
            Ok(()) => {
                debug!("Added host keys for {endpoint}");
                true
            }
            Err(e) => {
                warn!("Could not write {} ({e}), continuing", self.known_hosts.display());
                false
            }
        }
    }

    /// Appends a host block for the pod to the SSH client configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be written.
    pub async fn add_config_entry(
        &self,
        pod_id: &str,
        pod_name: &str,
        endpoint: &SshEndpoint,
    ) -> Result<SshConfigEntry> {
        let entry = SshConfigEntry::for_pod(pod_id, pod_name, endpoint, &self.identity_file);
        info!("Adding SSH config entry '{}' to {}", entry.alias, self.ssh_config.display());

        append(&self.ssh_config, &entry.render()).await?;
        Ok(entry)
    }
}

/// Appends text to a file, creating it and its parent directory if needed.
async fn append(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(text.as_bytes()).await?;
    file.flush().await
}
