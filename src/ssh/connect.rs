//! SSH connection test and remote editor launch.
//!
//! Both steps are informational: a failure is logged and the launch carries on.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{EditorConfig, PollingConfig};
use crate::runpod::SshEndpoint;

use super::registrar::SSH_USER;
use super::runner::CommandRunner;

/// Message echoed by the pod when the test connection succeeds.
pub const SSH_TEST_MESSAGE: &str = "SSH connection successful!";

/// Verifies SSH access and opens the editor on the pod.
pub struct ConnectionVerifier {
    runner: Arc<dyn CommandRunner>,
    identity_file: PathBuf,
    warmup: Duration,
    test_timeout: Duration,
    editor: EditorConfig,
}

impl std::fmt::Debug for ConnectionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionVerifier")
            .field("identity_file", &self.identity_file)
            .field("warmup", &self.warmup)
            .field("test_timeout", &self.test_timeout)
            .field("editor", &self.editor)
            .finish_non_exhaustive()
    }
}

impl ConnectionVerifier {
    /// Creates a verifier with the configured timings and editor.
    #[must_use]
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        identity_file: impl Into<PathBuf>,
        polling: &PollingConfig,
        editor: EditorConfig,
    ) -> Self {
        Self {
            runner,
            identity_file: identity_file.into(),
            warmup: Duration::from_secs(polling.ssh_warmup_secs),
            test_timeout: Duration::from_secs(polling.ssh_test_timeout_secs),
            editor,
        }
    }

    /// Arguments of the non-interactive test connection.
    fn test_args(&self, endpoint: &SshEndpoint) -> Vec<String> {
        vec![
            String::from("-o"),
            String::from("ConnectTimeout=10"),
            String::from("-o"),
            String::from("BatchMode=yes"),
            String::from("-o"),
            String::from("StrictHostKeyChecking=no"),
            String::from("-i"),
            self.identity_file.display().to_string(),
            String::from("-p"),
            endpoint.port.to_string(),
            format!("{SSH_USER}@{}", endpoint.host),
            format!("echo '{SSH_TEST_MESSAGE}'"),
        ]
    }

    /// Waits for sshd to come up, then runs a one-shot command on the pod.
    ///
    /// Returns whether the connection succeeded.
    pub async fn verify(&self, endpoint: &SshEndpoint) -> bool {
        if !self.warmup.is_zero() {
            info!("Waiting {}s for SSH to come up", self.warmup.as_secs());
            tokio::time::sleep(self.warmup).await;
        }

        info!("Testing SSH connection to {endpoint}");
        match self.runner.run("ssh", &self.test_args(endpoint), self.test_timeout).await {
            Ok(output) if output.success => {
                info!("{}", output.stdout.trim());
                true
            }
            Ok(output) => {
                warn!(
                    "SSH test failed (exit code {:?}): {}",
                    output.exit_code,
                    output.stderr.trim()
                );
                false
            }
            Err(e) => {
                warn!("SSH test could not run: {e}");
                false
            }
        }
    }

    /// Opens the editor on the pod through its SSH alias, without waiting.
    ///
    /// Returns whether the editor was started. A disabled editor is skipped.
    pub fn launch_editor(&self, alias: &str) -> bool {
        if !self.editor.enabled {
            info!("Editor launch disabled");
            return false;
        }

        let args = vec![
            String::from("--remote"),
            format!("ssh-remote+{alias}"),
            self.editor.start_dir.clone(),
        ];

        info!("Opening {} on {alias}:{}", self.editor.command, self.editor.start_dir);
        match self.runner.spawn_detached(&self.editor.command, &args) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Could not start '{}' ({e}); connect manually with: {} --remote ssh-remote+{alias} {}",
                    self.editor.command, self.editor.command, self.editor.start_dir
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::runner::fake::{FakeRunner, failed, ok};

    fn endpoint() -> SshEndpoint {
        SshEndpoint {
            host: String::from("1.2.3.4"),
            port: 40222,
            is_public: true,
        }
    }

    fn verifier(runner: Arc<FakeRunner>, editor: EditorConfig) -> ConnectionVerifier {
        let polling = PollingConfig {
            ssh_warmup_secs: 0,
            ..PollingConfig::default()
        };
        ConnectionVerifier::new(runner, "/home/op/.ssh/id_rsa", &polling, editor)
    }

    #[tokio::test]
    async fn test_verify_runs_batch_ssh() {
        let runner = Arc::new(FakeRunner::with_responses(vec![ok("SSH connection successful!\n")]));
        let verifier = verifier(runner.clone(), EditorConfig::default());

        assert!(verifier.verify(&endpoint()).await);

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "ssh");
        assert_eq!(
            calls[0].args,
            [
                "-o",
                "ConnectTimeout=10",
                "-o",
                "BatchMode=yes",
                "-o",
                "StrictHostKeyChecking=no",
                "-i",
                "/home/op/.ssh/id_rsa",
                "-p",
                "40222",
                "root@1.2.3.4",
                "echo 'SSH connection successful!'",
            ]
        );
    }

    #[tokio::test]
    async fn test_verify_failure_is_reported_not_raised() {
        let runner = Arc::new(FakeRunner::with_responses(vec![
            failed(255, "Permission denied (publickey)."),
            Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "ssh timed out")),
        ]));
        let verifier = verifier(runner, EditorConfig::default());

        assert!(!verifier.verify(&endpoint()).await);
        assert!(!verifier.verify(&endpoint()).await);
    }

    #[test]
    fn test_launch_editor_detached() {
        let runner = Arc::new(FakeRunner::default());
        let verifier = verifier(runner.clone(), EditorConfig::default());

        assert!(verifier.launch_editor("runpod-abc123"));

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "code");
        assert_eq!(
            calls[0].args,
            ["--remote", "ssh-remote+runpod-abc123", "/workspace/assignment5-alignment"]
        );
        assert!(calls[0].detached);
    }

    #[test]
    fn test_missing_editor_is_not_fatal() {
        let runner = Arc::new(FakeRunner::default().failing_spawn());
        let verifier = verifier(runner.clone(), EditorConfig::default());

        assert!(!verifier.launch_editor("runpod-abc123"));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_disabled_editor_is_skipped() {
        let runner = Arc::new(FakeRunner::default());
        let editor = EditorConfig {
            enabled: false,
            ..EditorConfig::default()
        };
        let verifier = verifier(runner.clone(), editor);

        assert!(!verifier.launch_editor("runpod-abc123"));
        assert!(runner.calls().is_empty());
    }
}
