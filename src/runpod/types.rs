//! `RunPod` API types and data structures.
//!
//! This module defines the types used for communication with the `RunPod` API.
//! Every field the service may omit is optional so a half-initialised pod
//! still deserializes.

use serde::{Deserialize, Serialize};

/// Private port the SSH daemon listens on inside the container.
pub const SSH_PRIVATE_PORT: u16 = 22;

/// A `RunPod` pod snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    /// Unique pod identifier.
    pub id: String,
    /// Pod name.
    #[serde(default)]
    pub name: Option<String>,
    /// Desired status.
    #[serde(default)]
    pub desired_status: PodStatus,
    /// Runtime information, present once the pod is running.
    #[serde(default)]
    pub runtime: Option<PodRuntime>,
}

/// Pod runtime information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodRuntime {
    /// Uptime in seconds.
    #[serde(default)]
    pub uptime_in_seconds: Option<u64>,
    /// Exposed ports.
    #[serde(default)]
    pub ports: Option<Vec<PodPort>>,
    /// GPU utilization samples.
    #[serde(default)]
    pub gpus: Option<Vec<RunPodGpu>>,
}

/// Pod port mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodPort {
    /// Host or IP the port is reachable on.
    #[serde(default)]
    pub ip: Option<String>,
    /// Whether `ip` is a public address.
    #[serde(default)]
    pub is_ip_public: Option<bool>,
    /// Port inside the container.
    #[serde(default)]
    pub private_port: Option<u16>,
    /// Port exposed to the outside.
    #[serde(default)]
    pub public_port: Option<u16>,
    /// Port type (tcp, http).
    #[serde(default, rename = "type")]
    pub port_type: Option<String>,
}

/// GPU utilization sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPodGpu {
    /// GPU ID.
    pub id: String,
    /// GPU utilization percentage.
    #[serde(default)]
    pub gpu_util_percent: Option<f32>,
    /// Memory utilization percentage.
    #[serde(default)]
    pub memory_util_percent: Option<f32>,
}

/// Pod status enum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PodStatus {
    /// Pod is running.
    Running,
    /// Pod is exited.
    Exited,
    /// Pod is terminated.
    Terminated,
    /// Pod is being created.
    Created,
    /// Unknown status.
    #[default]
    #[serde(other)]
    Unknown,
}

/// A network volume registered on the account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkVolume {
    /// Volume identifier.
    pub id: String,
    /// Volume name.
    pub name: String,
    /// Size in GB.
    pub size: u64,
    /// Datacenter holding the volume.
    pub data_center_id: String,
}

/// Environment variable passed to a new pod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodEnvVar {
    /// Variable key.
    pub key: String,
    /// Variable value.
    pub value: String,
}

/// Input of the `podFindAndDeployOnDemand` mutation.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeployPodInput {
    /// Cloud type (SECURE or COMMUNITY).
    pub cloud_type: String,
    /// Number of GPUs.
    pub gpu_count: u32,
    /// Pod volume in GB.
    pub volume_in_gb: u32,
    /// Container disk in GB.
    pub container_disk_in_gb: u32,
    /// Minimum vCPU count.
    pub min_vcpu_count: u32,
    /// Minimum memory in GB.
    pub min_memory_in_gb: u32,
    /// GPU type ID.
    pub gpu_type_id: String,
    /// Pod name.
    pub name: String,
    /// Datacenter ID.
    pub data_center_id: String,
    /// Template ID.
    pub template_id: String,
    /// Ports to expose (e.g., "22/tcp,8888/http").
    pub ports: String,
    /// Volume mount path.
    pub volume_mount_path: String,
    /// Network volume ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_volume_id: Option<String>,
    /// Whether to request a public IP.
    pub support_public_ip: bool,
    /// Environment variables.
    pub env: Vec<PodEnvVar>,
}

/// Result of the deploy mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedPod {
    /// New pod identifier.
    pub id: String,
    /// Image the pod runs.
    #[serde(default)]
    pub image_name: Option<String>,
    /// Machine the pod was scheduled on.
    #[serde(default)]
    pub machine_id: Option<String>,
    /// Hourly cost in USD.
    #[serde(default)]
    pub cost_per_hr: Option<f64>,
    /// Machine details.
    #[serde(default)]
    pub machine: Option<DeployedMachine>,
}

/// Machine details of a freshly deployed pod.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedMachine {
    /// Host identifier of the pod on the machine.
    #[serde(default)]
    pub pod_host_id: Option<String>,
}

/// Direct SSH endpoint of a pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshEndpoint {
    /// Host or IP address.
    pub host: String,
    /// Public port mapped to container port 22.
    pub port: u16,
    /// Whether `host` is a public address.
    pub is_public: bool,
}

impl Pod {
    /// Returns true once the pod reports a runtime record. The record counts
    /// even when every field in it is still null.
    #[must_use]
    pub const fn has_runtime(&self) -> bool {
        self.runtime.is_some()
    }

    /// Returns the direct SSH endpoint, if port 22 is exposed with both a
    /// host and a public port.
    #[must_use]
    pub fn ssh_endpoint(&self) -> Option<SshEndpoint> {
        let port = self
            .runtime
            .as_ref()?
            .ports
            .as_ref()?
            .iter()
            .find(|p| p.private_port == Some(SSH_PRIVATE_PORT))?;

        let host = port.ip.as_deref().filter(|ip| !ip.is_empty())?;
        let public_port = port.public_port?;

        Some(SshEndpoint {
            host: host.to_string(),
            port: public_port,
            is_public: port.is_ip_public.unwrap_or(false),
        })
    }

    /// Returns the ports currently exposed, or an empty slice.
    #[must_use]
    pub fn ports(&self) -> &[PodPort] {
        self.runtime
            .as_ref()
            .and_then(|r| r.ports.as_deref())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for PodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Running => "running",
            Self::Exited => "exited",
            Self::Terminated => "terminated",
            Self::Created => "created",
            Self::Unknown => "unknown",
        };
        write!(f, "{status}")
    }
}

impl std::fmt::Display for SshEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod(value: serde_json::Value) -> Pod {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_no_runtime_is_not_ready() {
        let p = pod(json!({ "id": "abc123", "desiredStatus": "RUNNING", "runtime": null }));
        assert!(!p.has_runtime());
        assert!(p.ssh_endpoint().is_none());
    }

    #[test]
    fn test_runtime_with_null_fields_is_ready() {
        let p = pod(json!({
            "id": "abc123",
            "runtime": { "uptimeInSeconds": null, "ports": null, "gpus": null }
        }));
        assert!(p.has_runtime());
        assert!(p.ports().is_empty());
        assert!(p.ssh_endpoint().is_none());
    }

    #[test]
    fn test_runtime_with_uptime_is_ready() {
        let p = pod(json!({ "id": "abc123", "runtime": { "uptimeInSeconds": 3, "ports": [] } }));
        assert!(p.has_runtime());
        assert!(p.ssh_endpoint().is_none());
    }

    #[test]
    fn test_ssh_endpoint_found() {
        let p = pod(json!({
            "id": "abc123",
            "runtime": {
                "ports": [
                    { "ip": "100.65.0.2", "privatePort": 8888, "publicPort": 60001, "type": "http", "isIpPublic": false },
                    { "ip": "1.2.3.4", "privatePort": 22, "publicPort": 40222, "type": "tcp", "isIpPublic": true }
                ]
            }
        }));

        let endpoint = p.ssh_endpoint().unwrap();
        assert_eq!(endpoint.host, "1.2.3.4");
        assert_eq!(endpoint.port, 40222);
        assert!(endpoint.is_public);
        assert_eq!(endpoint.to_string(), "1.2.3.4:40222");
    }

    #[test]
    fn test_ssh_endpoint_requires_host_and_public_port() {
        let missing_public = pod(json!({
            "id": "p", "runtime": { "ports": [ { "ip": "1.2.3.4", "privatePort": 22 } ] }
        }));
        assert!(missing_public.ssh_endpoint().is_none());

        let empty_ip = pod(json!({
            "id": "p", "runtime": { "ports": [ { "ip": "", "privatePort": 22, "publicPort": 40222 } ] }
        }));
        assert!(empty_ip.ssh_endpoint().is_none());
    }

    #[test]
    fn test_unknown_status_tolerated() {
        let p = pod(json!({ "id": "p", "desiredStatus": "MIGRATING" }));
        assert_eq!(p.desired_status, PodStatus::Unknown);
        assert_eq!(p.desired_status.to_string(), "unknown");

        let running = pod(json!({ "id": "p", "desiredStatus": "RUNNING" }));
        assert_eq!(running.desired_status.to_string(), "running");
    }
}
