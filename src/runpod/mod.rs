//! `RunPod` API integration.
//!
//! This module provides the client for the `RunPod` GraphQL API together with
//! the account queries, pod provisioning and readiness polling built on it.

mod client;
mod inventory;
mod poller;
mod provisioner;
mod types;

pub use client::RunPodClient;
pub use inventory::{Inventory, KeyMatch, compare_keys};
pub use poller::{PHASE_BOOTING, PHASE_PORT_DISCOVERY, ReadinessPoller, RetryPolicy, retry_until};
pub use provisioner::{PUBLIC_KEY_ENV, PodProvisioner, ProvisionedPod, generate_pod_name};
pub use types::{
    DeployPodInput, DeployedMachine, DeployedPod, NetworkVolume, Pod, PodEnvVar, PodPort,
    PodRuntime, PodStatus, RunPodGpu, SSH_PRIVATE_PORT, SshEndpoint,
};
