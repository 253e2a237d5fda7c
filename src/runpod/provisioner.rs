//! Pod provisioner for deploying `RunPod` pods.
//!
//! This module maps a [`PodProfile`] onto the deploy mutation and validates
//! what comes back. A failed deploy is never rolled back: the pod either
//! exists and is billable, or it does not.

use chrono::{DateTime, TimeZone};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::PodProfile;
use crate::error::{Result, RunPodError};

use super::client::RunPodClient;
use super::types::{DeployPodInput, DeployedPod, PodEnvVar};

/// Environment variable the pod template reads the SSH public key from.
pub const PUBLIC_KEY_ENV: &str = "PUBLIC_KEY";

const DEPLOY_MUTATION: &str = r"
    mutation PodFindAndDeployOnDemand($input: PodFindAndDeployOnDemandInput!) {
        podFindAndDeployOnDemand(input: $input) {
            id
            imageName
            machineId
            costPerHr
            machine {
                podHostId
            }
        }
    }
";

/// Pod provisioner.
#[derive(Debug)]
pub struct PodProvisioner {
    /// `RunPod` API client.
    client: RunPodClient,
}

/// A pod that was deployed and priced.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionedPod {
    /// Pod identifier.
    pub id: String,
    /// Name the pod was deployed under.
    pub name: String,
    /// Hourly cost in USD.
    pub cost_per_hr: f64,
    /// Machine the pod was scheduled on.
    pub machine_id: Option<String>,
    /// Image the pod runs.
    pub image_name: Option<String>,
}

impl PodProvisioner {
    /// Creates a new pod provisioner.
    #[must_use]
    pub const fn new(client: RunPodClient) -> Self {
        Self { client }
    }

    /// Builds the deploy mutation input from a profile.
    ///
    /// The public key, when present, is injected as `PUBLIC_KEY`.
    #[must_use]
    pub fn build_input(
        profile: &PodProfile,
        pod_name: &str,
        public_key: Option<&str>,
    ) -> DeployPodInput {
        let env = public_key
            .filter(|k| !k.is_empty())
            .map(|k| PodEnvVar {
                key: String::from(PUBLIC_KEY_ENV),
                value: k.to_string(),
            })
            .into_iter()
            .collect();

        DeployPodInput {
            cloud_type: profile.cloud_type.as_api_str().to_string(),
            gpu_count: profile.gpu_count,
            volume_in_gb: profile.volume_in_gb,
            container_disk_in_gb: profile.container_disk_in_gb,
            min_vcpu_count: profile.min_vcpu_count,
            min_memory_in_gb: profile.min_memory_in_gb,
            gpu_type_id: profile.gpu_type_id.clone(),
            name: pod_name.to_string(),
            data_center_id: profile.data_center_id.clone(),
            template_id: profile.template_id.clone(),
            ports: profile.ports_string(),
            volume_mount_path: profile.volume_mount_path.clone(),
            network_volume_id: profile.network_volume_id.clone(),
            support_public_ip: profile.support_public_ip,
            env,
        }
    }

    /// Deploys a pod with the given profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails, or `InvalidResponse` if the
    /// response has no hourly cost.
    pub async fn create_pod(
        &self,
        profile: &PodProfile,
        pod_name: &str,
        public_key: Option<&str>,
    ) -> Result<ProvisionedPod> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "podFindAndDeployOnDemand")]
            pod: Option<DeployedPod>,
        }

        if public_key.is_none_or(str::is_empty) {
            warn!("No SSH public key available; the pod will only accept keys registered on the account");
        }

        let input = Self::build_input(profile, pod_name, public_key);
        info!(
            "Deploying pod {pod_name}: {} x {} in {} ({})",
            input.gpu_count, input.gpu_type_id, input.data_center_id, input.cloud_type
        );
        debug!("Deploy input: {input:?}");

        let variables = serde_json::json!({ "input": input });
        let response: Response = self.client.execute(DEPLOY_MUTATION, Some(variables)).await?;

        let deployed = response
            .pod
            .ok_or_else(|| RunPodError::invalid_response("podFindAndDeployOnDemand returned null"))?;

        Self::priced(deployed, pod_name)
    }

    fn priced(deployed: DeployedPod, pod_name: &str) -> Result<ProvisionedPod> {
        let Some(cost_per_hr) = deployed.cost_per_hr else {
            return Err(RunPodError::invalid_response(format!(
                "Hourly cost not found in deploy response for pod {}",
                deployed.id
            ))
            .into());
        };

        info!("Created pod {} at ${cost_per_hr:.3}/hr", deployed.id);

        Ok(ProvisionedPod {
            id: deployed.id,
            name: pod_name.to_string(),
            cost_per_hr,
            machine_id: deployed.machine_id,
            image_name: deployed.image_name,
        })
    }
}

/// Generates a pod name of the form `<prefix>-YYYYMMDD-HHMMSS`.
#[must_use]
pub fn generate_pod_name<Tz: TimeZone>(prefix: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{prefix}-{}", now.format("%Y%m%d-%H%M%S"))
}
