//! End-to-end pod launch.
//!
//! The steps run strictly in order: deploy, wait for SSH, register the pod
//! locally, test the connection, open the editor. Only the first two can
//! fail the launch. Nothing is rolled back: a pod that was created stays
//! billable until it is stopped from the console, so every failure after
//! deployment names the pod.

use chrono::Local;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::{Credentials, LaunchConfig, ResolvedPaths};
use crate::error::{LaunchError, Result};
use crate::runpod::{PodProvisioner, ReadinessPoller, RunPodClient, generate_pod_name};
use crate::ssh::{CommandRunner, ConnectionRegistrar, ConnectionVerifier};

/// Drives a single pod launch.
#[derive(Debug)]
pub struct Launcher<'a> {
    /// Launcher configuration.
    config: &'a LaunchConfig,
    /// Public key injected into the pod.
    public_key: Option<&'a str>,
    /// Pod provisioner.
    provisioner: PodProvisioner,
    /// Readiness poller.
    poller: ReadinessPoller,
    /// Known-hosts and SSH config writer.
    registrar: ConnectionRegistrar,
    /// SSH test and editor launch.
    verifier: ConnectionVerifier,
}

/// What a successful launch produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchOutcome {
    /// Pod identifier.
    pub pod_id: String,
    /// Pod name.
    pub pod_name: String,
    /// Hourly cost in USD.
    pub cost_per_hr: f64,
    /// SSH alias, if it was written to the SSH config.
    pub alias: Option<String>,
    /// SSH host.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Whether the host key was added to known-hosts.
    pub known_host_added: bool,
    /// Whether the SSH test connection succeeded.
    pub ssh_verified: bool,
    /// Whether the editor was started.
    pub editor_launched: bool,
}

impl<'a> Launcher<'a> {
    /// Creates a launcher from loaded configuration and credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: &'a LaunchConfig,
        paths: &ResolvedPaths,
        credentials: &'a Credentials,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        let client = RunPodClient::new(&credentials.api_key, &config.api)?;
        debug!("Using RunPod API at {}", client.endpoint());

        let registrar = ConnectionRegistrar::new(
            Arc::clone(&runner),
            &paths.known_hosts,
            &paths.ssh_config,
            &paths.ssh_private_key,
        )
        .with_keyscan_timeout(Duration::from_secs(config.polling.keyscan_timeout_secs));

        let verifier = ConnectionVerifier::new(
            runner,
            &paths.ssh_private_key,
            &config.polling,
            config.editor.clone(),
        );

        Ok(Self {
            config,
            public_key: credentials.public_key.as_deref(),
            provisioner: PodProvisioner::new(client.clone()),
            poller: ReadinessPoller::new(client, &config.polling),
            registrar,
            verifier,
        })
    }

    /// Runs the launch with a pod name stamped with the local time.
    ///
    /// # Errors
    ///
    /// Returns an error if deployment fails or the pod never becomes
    /// reachable. The latter is `LaunchError::PodUnreachable`, naming the pod.
    pub async fn run(&self) -> Result<LaunchOutcome> {
        let pod_name = generate_pod_name(&self.config.pod.name_prefix, &Local::now());
        self.run_named(&pod_name).await
    }

    /// Runs the launch with the given pod name.
    ///
    /// # Errors
    ///
    /// Same as [`Launcher::run`].
    pub async fn run_named(&self, pod_name: &str) -> Result<LaunchOutcome> {
        let pod = self
            .provisioner
            .create_pod(&self.config.pod, pod_name, self.public_key)
            .await?;

        let endpoint = match self.poller.wait_until_reachable(&pod.id).await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                error!(
                    "Pod {} was created but never became reachable; it is still billed until stopped from the console",
                    pod.id
                );
                return Err(LaunchError::unreachable(pod.id, e));
            }
        };

        let known_host_added = self.registrar.add_known_host(&endpoint).await;
        let alias = match self
            .registrar
            .add_config_entry(&pod.id, &pod.name, &endpoint)
            .await
        {
            Ok(entry) => Some(entry.alias),
            Err(e) => {
                error!(
                    "Could not add pod {} to the SSH config ({e}); connect with: {}",
                    pod.id,
                    self.registrar.manual_command(&endpoint)
                );
                None
            }
        };

        let ssh_verified = self.verifier.verify(&endpoint).await;
        let editor_launched = alias
            .as_deref()
            .is_some_and(|alias| self.verifier.launch_editor(alias));

        info!("Pod {} is ready at {endpoint}", pod.id);

        Ok(LaunchOutcome {
            pod_id: pod.id,
            pod_name: pod.name,
            cost_per_hr: pod.cost_per_hr,
            alias,
            host: endpoint.host,
            port: endpoint.port,
            known_host_added,
            ssh_verified,
            editor_launched,
        })
    }
}

/// Runs `work` until it finishes or `interrupt` fires first.
///
/// # Errors
///
/// Returns `LaunchError::Interrupted` if `interrupt` completes first,
/// otherwise the result of `work`.
pub async fn until_interrupted<T, W, I>(work: W, interrupt: I) -> Result<T>
where
    W: Future<Output = Result<T>>,
    I: Future,
{
    tokio::select! {
        result = work => result,
        _ = interrupt => {
            error!("Interrupted; any pod already created keeps running and is billed");
            Err(LaunchError::Interrupted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RunPodError;
    use crate::ssh::fake::{FakeRunner, ok};
    use serde_json::json;
    use std::path::Path;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, boot_attempts: u32) -> LaunchConfig {
        let mut config = LaunchConfig::default();
        config.api.endpoint = server.uri();
        config.polling.boot_attempts = boot_attempts;
        config.polling.port_attempts = 3;
        config.polling.interval_secs = 0;
        config.polling.ssh_warmup_secs = 0;
        config
    }

    fn paths_in(dir: &Path) -> ResolvedPaths {
        let ssh = dir.join(".ssh");
        ResolvedPaths {
            api_key_file: dir.join(".runpod_api_key.txt"),
            ssh_private_key: ssh.join("id_rsa"),
            ssh_public_key: ssh.join("id_rsa.pub"),
            ssh_config: ssh.join("config"),
            known_hosts: ssh.join("known_hosts"),
            runpodctl_public_key: dir.join(".runpod").join("ssh").join("RunPod-Key-Go.pub"),
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            api_key: String::from("test-key"),
            public_key: Some(String::from("ssh-rsa AAAA op@laptop")),
        }
    }

    async fn mount_deploy(server: &MockServer) {
        Mock::given(method("POST"))
            .and(body_string_contains("podFindAndDeployOnDemand"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "podFindAndDeployOnDemand": {
                    "id": "abc123", "imageName": "runpod/pytorch", "machineId": "m1",
                    "costPerHr": 0.89, "machine": { "podHostId": "abc123-64410c0a" }
                } }
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_pending_pod(server: &MockServer, times: u64) {
        Mock::given(method("POST"))
            .and(body_string_contains("PodFilter"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "pod": { "id": "abc123", "desiredStatus": "RUNNING", "runtime": null } }
            })))
            .up_to_n_times(times)
            .mount(server)
            .await;
    }

    async fn mount_ready_pod(server: &MockServer) {
        Mock::given(method("POST"))
            .and(body_string_contains("PodFilter"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "pod": { "id": "abc123", "desiredStatus": "RUNNING", "runtime": {
                    "uptimeInSeconds": 12,
                    "ports": [
                        { "ip": "100.65.0.7", "isIpPublic": false, "privatePort": 8888, "publicPort": 60001, "type": "http" },
                        { "ip": "1.2.3.4", "isIpPublic": true, "privatePort": 22, "publicPort": 40222, "type": "tcp" }
                    ],
                    "gpus": [ { "id": "gpu0", "gpuUtilPercent": 0, "memoryUtilPercent": 0 } ]
                } } }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_launch_end_to_end() {
        let server = MockServer::start().await;
        mount_deploy(&server).await;
        mount_pending_pod(&server, 2).await;
        mount_ready_pod(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&server, 5);
        let paths = paths_in(dir.path());
        let credentials = credentials();
        let runner = Arc::new(FakeRunner::with_responses(vec![
            ok("|1|salt= ssh-ed25519 AAAAC3Nz\n"),
            ok("SSH connection successful!\n"),
        ]));

        let launcher = Launcher::new(&config, &paths, &credentials, runner.clone()).unwrap();
        let outcome = launcher.run_named("a100-pcie-pod-20240305-070809").await.unwrap();

        assert_eq!(outcome.pod_id, "abc123");
        assert_eq!(outcome.alias.as_deref(), Some("runpod-abc123"));
        assert_eq!(outcome.host, "1.2.3.4");
        assert_eq!(outcome.port, 40222);
        assert!((outcome.cost_per_hr - 0.89).abs() < f64::EPSILON);
        assert!(outcome.known_host_added);
        assert!(outcome.ssh_verified);
        assert!(outcome.editor_launched);

        let ssh_config = std::fs::read_to_string(&paths.ssh_config).unwrap();
        assert_eq!(ssh_config.matches("Host runpod-abc123\n").count(), 1);
        assert!(ssh_config.contains("    HostName 1.2.3.4\n"));
        assert!(ssh_config.contains("    Port 40222\n"));
        assert!(ssh_config.contains("# RunPod Pod: a100-pcie-pod-20240305-070809\n"));

        let known_hosts = std::fs::read_to_string(&paths.known_hosts).unwrap();
        assert!(known_hosts.contains("ssh-ed25519"));

        let programs: Vec<String> = runner.calls().into_iter().map(|c| c.program).collect();
        assert_eq!(programs, ["ssh-keyscan", "ssh", "code"]);
    }

    #[tokio::test]
    async fn test_unreachable_pod_fails_without_registration() {
        let server = MockServer::start().await;
        mount_deploy(&server).await;
        mount_pending_pod(&server, 10).await;

        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&server, 3);
        let paths = paths_in(dir.path());
        let credentials = credentials();
        let runner = Arc::new(FakeRunner::default());

        let launcher = Launcher::new(&config, &paths, &credentials, runner.clone()).unwrap();
        let err = launcher.run_named("pod-1").await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.pod_id(), Some("abc123"));
        match err {
            LaunchError::PodUnreachable { source, .. } => assert!(matches!(
                *source,
                LaunchError::RunPod(RunPodError::Timeout { attempts: 3, .. })
            )),
            other => panic!("expected an unreachable pod, got {other:?}"),
        }
        assert!(!paths.ssh_config.exists());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_ssh_config_still_reports_pod() {
        let server = MockServer::start().await;
        mount_deploy(&server).await;
        mount_ready_pod(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&server, 3);
        let paths = paths_in(dir.path());
        std::fs::create_dir_all(&paths.ssh_config).unwrap();
        let credentials = credentials();
        let runner = Arc::new(FakeRunner::with_responses(vec![
            ok("|1|salt= ssh-ed25519 AAAAC3Nz\n"),
            ok("SSH connection successful!\n"),
        ]));

        let launcher = Launcher::new(&config, &paths, &credentials, runner.clone()).unwrap();
        let outcome = launcher.run_named("pod-1").await.unwrap();

        assert_eq!(outcome.pod_id, "abc123");
        assert_eq!(outcome.alias, None);
        assert_eq!(outcome.host, "1.2.3.4");
        assert_eq!(outcome.port, 40222);
        assert!(outcome.ssh_verified);
        assert!(!outcome.editor_launched);

        let programs: Vec<String> = runner.calls().into_iter().map(|c| c.program).collect();
        assert_eq!(programs, ["ssh-keyscan", "ssh"]);
    }

    #[tokio::test]
    async fn test_interrupt_wins_over_pending_work() {
        let result: Result<()> = until_interrupted(std::future::pending(), async {}).await;
        assert!(matches!(result, Err(LaunchError::Interrupted)));

        let done = until_interrupted(async { Ok(7) }, std::future::pending::<()>()).await;
        assert_eq!(done.unwrap(), 7);
    }
}
