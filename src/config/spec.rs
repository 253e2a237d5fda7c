//! Configuration types for the pod launcher.
//!
//! Every section has compiled-in defaults that reproduce the standard A100
//! workstation profile, so the tool runs without any configuration file. A
//! `runpod-launch.yaml` file only needs to name the values it changes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LaunchConfig {
    /// `RunPod` API settings.
    pub api: ApiConfig,
    /// Hardware and software profile of the pod to deploy.
    pub pod: PodProfile,
    /// Local credential and SSH file locations.
    pub paths: PathsConfig,
    /// Readiness polling and subprocess timing.
    pub polling: PollingConfig,
    /// Editor launched against the new pod.
    pub editor: EditorConfig,
}

/// `RunPod` API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// GraphQL endpoint.
    pub endpoint: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Pod hardware and software profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PodProfile {
    /// Prefix of the generated pod name; a timestamp is appended.
    pub name_prefix: String,
    /// Cloud tier.
    pub cloud_type: CloudType,
    /// GPU type identifier (e.g., "NVIDIA A100 80GB PCIe").
    pub gpu_type_id: String,
    /// Number of GPUs.
    pub gpu_count: u32,
    /// Pod volume in GB (0 when a network volume is attached).
    pub volume_in_gb: u32,
    /// Container disk in GB.
    pub container_disk_in_gb: u32,
    /// Minimum vCPU count.
    pub min_vcpu_count: u32,
    /// Minimum system memory in GB.
    pub min_memory_in_gb: u32,
    /// Datacenter to deploy in.
    pub data_center_id: String,
    /// Template identifier.
    pub template_id: String,
    /// Exposed ports.
    pub ports: Vec<PortConfig>,
    /// Mount path of the volume inside the container.
    pub volume_mount_path: String,
    /// Network volume to attach.
    pub network_volume_id: Option<String>,
    /// Whether the pod should get a public IP.
    pub support_public_ip: bool,
}

/// Cloud type options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CloudType {
    /// Secure cloud (dedicated hardware).
    #[default]
    Secure,
    /// Community cloud (shared resources).
    Community,
}

/// Port configuration for a pod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct PortConfig {
    /// Port number.
    pub port: u16,
    /// Protocol type.
    pub protocol: PortProtocol,
}

/// Port protocol types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
    /// TCP protocol.
    Tcp,
    /// HTTP protocol (implies TCP).
    #[default]
    Http,
}

/// Local file locations. A leading `~/` is expanded to the home directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    /// File holding the `RunPod` API key.
    pub api_key_file: String,
    /// SSH private key used to reach the pod.
    pub ssh_private_key: String,
    /// SSH public key injected into the pod.
    pub ssh_public_key: String,
    /// SSH client configuration file.
    pub ssh_config: String,
    /// SSH known-hosts file.
    pub known_hosts: String,
    /// Public key generated by `runpodctl`.
    pub runpodctl_public_key: String,
}

/// Polling and subprocess timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollingConfig {
    /// Attempts to wait for the pod runtime to appear.
    pub boot_attempts: u32,
    /// Attempts to wait for the SSH port to be exposed.
    pub port_attempts: u32,
    /// Delay between attempts, in seconds.
    pub interval_secs: u64,
    /// Delay before the SSH connectivity test, in seconds.
    pub ssh_warmup_secs: u64,
    /// Timeout of `ssh-keyscan`, in seconds.
    pub keyscan_timeout_secs: u64,
    /// Timeout of the SSH connectivity test, in seconds.
    pub ssh_test_timeout_secs: u64,
}

/// Editor launched against the pod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EditorConfig {
    /// Whether to launch the editor at all.
    pub enabled: bool,
    /// Editor executable.
    pub command: String,
    /// Remote directory opened in the editor.
    pub start_dir: String,
}

/// File locations with the home directory already expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// File holding the `RunPod` API key.
    pub api_key_file: PathBuf,
    /// SSH private key.
    pub ssh_private_key: PathBuf,
    /// SSH public key.
    pub ssh_public_key: PathBuf,
    /// SSH client configuration file.
    pub ssh_config: PathBuf,
    /// SSH known-hosts file.
    pub known_hosts: PathBuf,
    /// `runpodctl` public key.
    pub runpodctl_public_key: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("https://api.runpod.io/graphql"),
            timeout_secs: 30,
        }
    }
}

impl Default for PodProfile {
    fn default() -> Self {
        Self {
            name_prefix: String::from("a100-pcie-pod"),
            cloud_type: CloudType::Secure,
            gpu_type_id: String::from("NVIDIA A100 80GB PCIe"),
            gpu_count: 1,
            volume_in_gb: 0,
            container_disk_in_gb: 20,
            min_vcpu_count: 8,
            min_memory_in_gb: 100,
            data_center_id: String::from("CA-MTL-3"),
            template_id: String::from("runpod-torch-v240"),
            ports: vec![
                PortConfig::new(22, PortProtocol::Tcp),
                PortConfig::new(8888, PortProtocol::Http),
            ],
            volume_mount_path: String::from("/workspace"),
            network_volume_id: Some(String::from("v8du7ep4yk")),
            support_public_ip: true,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            api_key_file: String::from("~/.runpod_api_key.txt"),
            ssh_private_key: String::from("~/.ssh/id_rsa"),
            ssh_public_key: String::from("~/.ssh/id_rsa.pub"),
            ssh_config: String::from("~/.ssh/config"),
            known_hosts: String::from("~/.ssh/known_hosts"),
            runpodctl_public_key: String::from("~/.runpod/ssh/RunPod-Key-Go.pub"),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            boot_attempts: 60,
            port_attempts: 40,
            interval_secs: 5,
            ssh_warmup_secs: 15,
            keyscan_timeout_secs: 10,
            ssh_test_timeout_secs: 15,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: String::from("code"),
            start_dir: String::from("/workspace/assignment5-alignment"),
        }
    }
}

impl CloudType {
    /// Returns the API identifier of the cloud type.
    #[must_use]
    pub const fn as_api_str(self) -> &'static str {
        match self {
            Self::Secure => "SECURE",
            Self::Community => "COMMUNITY",
        }
    }
}

impl PodProfile {
    /// Returns the ports in the API's comma-separated form (`22/tcp,8888/http`).
    #[must_use]
    pub fn ports_string(&self) -> String {
        self.ports
            .iter()
            .cloned()
            .map(String::from)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Returns true if the profile exposes SSH over TCP.
    #[must_use]
    pub fn exposes_ssh(&self) -> bool {
        self.ports
            .iter()
            .any(|p| p.port == 22 && p.protocol == PortProtocol::Tcp)
    }
}

impl PathsConfig {
    /// Expands every path against the current user's home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a path starts with `~/` and no home directory is known.
    pub fn resolve(&self) -> Result<ResolvedPaths> {
        let home = dirs::home_dir();
        self.resolve_with_home(home.as_deref())
    }

    /// Expands every path against the given home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a path starts with `~/` and `home` is `None`.
    pub fn resolve_with_home(&self, home: Option<&Path>) -> Result<ResolvedPaths> {
        Ok(ResolvedPaths {
            api_key_file: expand_home(&self.api_key_file, home)?,
            ssh_private_key: expand_home(&self.ssh_private_key, home)?,
            ssh_public_key: expand_home(&self.ssh_public_key, home)?,
            ssh_config: expand_home(&self.ssh_config, home)?,
            known_hosts: expand_home(&self.known_hosts, home)?,
            runpodctl_public_key: expand_home(&self.runpodctl_public_key, home)?,
        })
    }
}

fn expand_home(raw: &str, home: Option<&Path>) -> Result<PathBuf> {
    match raw.strip_prefix("~/") {
        Some(rest) => home
            .map(|h| h.join(rest))
            .ok_or_else(|| ConfigError::NoHomeDir.into()),
        None => Ok(PathBuf::from(raw)),
    }
}

// Port config string conversion

impl TryFrom<String> for PortConfig {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<PortConfig> for String {
    fn from(port: PortConfig) -> Self {
        match port.protocol {
            PortProtocol::Tcp => format!("{}/tcp", port.port),
            PortProtocol::Http => format!("{}/http", port.port),
        }
    }
}

impl PortConfig {
    /// Parses a port configuration from a string like "8888/http".
    ///
    /// # Errors
    ///
    /// Returns an error if the port format is invalid.
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        let Some((number, protocol)) = s.trim().split_once('/') else {
            return Err(format!("Invalid port format: {s}. Expected format: PORT/PROTOCOL"));
        };

        let port = number
            .parse::<u16>()
            .map_err(|_| format!("Invalid port number: {number}"))?;

        let protocol = match protocol.to_lowercase().as_str() {
            "tcp" => PortProtocol::Tcp,
            "http" => PortProtocol::Http,
            other => return Err(format!("Invalid protocol: {other}. Expected: tcp or http")),
        };

        Ok(Self { port, protocol })
    }

    /// Creates a new port configuration.
    #[must_use]
    pub const fn new(port: u16, protocol: PortProtocol) -> Self {
        Self { port, protocol }
    }
}
