//! Readiness polling for freshly deployed pods.
//!
//! Both phases run on [`retry_until`]: a fixed number of attempts with a
//! fixed delay between them, where API errors count as a failed attempt.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::PollingConfig;
use crate::error::{Result, RunPodError};

use super::client::RunPodClient;
use super::types::{Pod, SshEndpoint};

/// Phase name used while waiting for the runtime record.
pub const PHASE_BOOTING: &str = "booting";

/// Phase name used while waiting for the SSH port.
pub const PHASE_PORT_DISCOVERY: &str = "port discovery";

/// Bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a new retry policy.
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Runs `attempt` until it yields a value or the policy runs out.
///
/// `attempt` receives the 1-based attempt number and returns `Ok(Some(v))`
/// when ready, `Ok(None)` when not ready yet. Transient errors are logged and
/// count as a failed attempt; any other error aborts immediately.
///
/// # Errors
///
/// Returns `RunPodError::Timeout` after exactly `max_attempts` failed attempts,
/// or the first non-transient error.
pub async fn retry_until<T, F, Fut>(policy: RetryPolicy, phase: &str, mut attempt: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for n in 1..=policy.max_attempts {
        match attempt(n).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {
                debug!("{phase}: attempt {n}/{} not ready yet", policy.max_attempts);
            }
            Err(e) if e.is_transient() => {
                warn!("{phase}: attempt {n}/{} failed: {e}", policy.max_attempts);
            }
            Err(e) => return Err(e),
        }

        if n < policy.max_attempts && !policy.delay.is_zero() {
            tokio::time::sleep(policy.delay).await;
        }
    }

    Err(RunPodError::Timeout {
        phase: phase.to_string(),
        attempts: policy.max_attempts,
    }
    .into())
}

/// Waits for a pod to boot and expose SSH.
#[derive(Debug)]
pub struct ReadinessPoller {
    /// `RunPod` API client.
    client: RunPodClient,
    /// Policy for the booting phase.
    boot: RetryPolicy,
    /// Policy for the port discovery phase.
    port: RetryPolicy,
}

impl ReadinessPoller {
    /// Creates a poller with the configured attempt bounds and interval.
    #[must_use]
    pub fn new(client: RunPodClient, config: &PollingConfig) -> Self {
        let delay = Duration::from_secs(config.interval_secs);
        Self {
            client,
            boot: RetryPolicy::new(config.boot_attempts, delay),
            port: RetryPolicy::new(config.port_attempts, delay),
        }
    }

    /// Waits until the pod reports a runtime record.
    ///
    /// # Errors
    ///
    /// Returns `RunPodError::Timeout` if the pod never starts.
    pub async fn wait_for_runtime(&self, pod_id: &str) -> Result<Pod> {
        info!("Waiting for pod {pod_id} to start");

        let pod = retry_until(self.boot, PHASE_BOOTING, move |_| async move {
            let pod = self.client.get_pod(pod_id).await?;
            debug!("Pod {pod_id} desired status: {}", pod.desired_status);
            Ok(pod.has_runtime().then_some(pod))
        })
        .await?;

        info!("Pod {pod_id} is up ({})", pod.desired_status);
        Ok(pod)
    }

    /// Waits until the pod exposes port 22 with a host and a public port.
    ///
    /// # Errors
    ///
    /// Returns `RunPodError::Timeout` if the port never appears.
    pub async fn wait_for_ssh(&self, pod_id: &str) -> Result<SshEndpoint> {
        info!("Waiting for pod {pod_id} to expose SSH");

        let endpoint = retry_until(self.port, PHASE_PORT_DISCOVERY, move |_| async move {
            let pod = self.client.get_pod(pod_id).await?;
            if pod.ports().is_empty() {
                debug!("Pod {pod_id} has no exposed ports yet");
            }
            Ok(pod.ssh_endpoint())
        })
        .await?;

        info!(
            "SSH endpoint for pod {pod_id}: {endpoint} (public IP: {})",
            endpoint.is_public
        );
        Ok(endpoint)
    }

    /// Runs both phases in order.
    ///
    /// # Errors
    ///
    /// Returns the first phase timeout.
    pub async fn wait_until_reachable(&self, pod_id: &str) -> Result<SshEndpoint> {
        self.wait_for_runtime(pod_id).await?;
        self.wait_for_ssh(pod_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::error::LaunchError;
    use serde_json::json;
    use std::cell::Cell;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NO_DELAY: RetryPolicy = RetryPolicy::new(5, Duration::ZERO);

    #[tokio::test]
    async fn test_times_out_after_exactly_max_attempts() {
        let calls = Cell::new(0_u32);

        let result: Result<()> = retry_until(NO_DELAY, "test", |_| {
            calls.set(calls.get() + 1);
            async { Ok(None) }
        })
        .await;

        assert_eq!(calls.get(), 5);
        match result {
            Err(LaunchError::RunPod(RunPodError::Timeout { phase, attempts })) => {
                assert_eq!(phase, "test");
                assert_eq!(attempts, 5);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transient_errors_consume_attempts() {
        let calls = Cell::new(0_u32);

        let result = retry_until(NO_DELAY, "test", |n| {
            calls.set(calls.get() + 1);
            async move {
                if n < 3 {
                    Err(LaunchError::from(RunPodError::transport(503, "unavailable")))
                } else {
                    Ok(Some(n))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_non_transient_error_aborts() {
        let calls = Cell::new(0_u32);

        let result: Result<()> = retry_until(NO_DELAY, "test", |_| {
            calls.set(calls.get() + 1);
            async { Err(LaunchError::Interrupted) }
        })
        .await;

        assert!(matches!(result, Err(LaunchError::Interrupted)));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_between_attempts_only() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        let start = tokio::time::Instant::now();

        let _: Result<()> = retry_until(policy, "test", |_| async { Ok(None) }).await;

        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    fn poller_for(server: &MockServer, boot_attempts: u32, port_attempts: u32) -> ReadinessPoller {
        let api = ApiConfig {
            endpoint: server.uri(),
            timeout_secs: 5,
        };
        let polling = PollingConfig {
            boot_attempts,
            port_attempts,
            interval_secs: 0,
            ..PollingConfig::default()
        };
        ReadinessPoller::new(RunPodClient::new("k", &api).unwrap(), &polling)
    }

    #[tokio::test]
    async fn test_boot_phase_survives_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "pod": { "id": "abc123", "runtime": { "uptimeInSeconds": 1 } } }
            })))
            .mount(&server)
            .await;

        let pod = poller_for(&server, 3, 1).wait_for_runtime("abc123").await.unwrap();
        assert!(pod.has_runtime());
    }

    #[tokio::test]
    async fn test_port_phase_times_out_without_ssh_port() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "pod": { "id": "abc123", "runtime": { "ports": [
                    { "ip": "1.2.3.4", "privatePort": 8888, "publicPort": 60000 }
                ] } } }
            })))
            .expect(4)
            .mount(&server)
            .await;

        let err = poller_for(&server, 1, 4).wait_for_ssh("abc123").await.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains(PHASE_PORT_DISCOVERY));
    }
}
