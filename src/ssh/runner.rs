//! Command runner abstraction for external tools.
//!
//! `ssh-keyscan`, `ssh` and the editor are all reached through
//! [`CommandRunner`] so tests can substitute a recording fake.

use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited with status 0.
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Trait for running external processes.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs a command to completion, capturing its output.
    ///
    /// A command still running after `timeout` is killed and reported as
    /// `io::ErrorKind::TimedOut`.
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> io::Result<CommandOutput>;

    /// Starts a command without waiting for it, with all standard streams
    /// detached.
    fn spawn_detached(&self, program: &str, args: &[String]) -> io::Result<()>;
}

/// Production runner backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> io::Result<CommandOutput> {
        debug!("Running {program} {}", args.join(" "));

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("{program} timed out after {}s", timeout.as_secs()),
                )
            })??;

        Ok(CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn spawn_detached(&self, program: &str, args: &[String]) -> io::Result<()> {
        debug!("Spawning {program} {}", args.join(" "));

        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(drop)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let output = SystemRunner
            .run("sh", &[String::from("-c"), String::from("echo out; echo err >&2; exit 3")], Duration::from_secs(5))
            .await
            .unwrap();

        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn test_system_runner_times_out() {
        let err = SystemRunner
            .run("sleep", &[String::from("5")], Duration::from_millis(100))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let result = SystemRunner
            .run("definitely-not-a-real-binary-xyz", &[], Duration::from_secs(1))
            .await;
        assert!(result.is_err());
        assert!(SystemRunner.spawn_detached("definitely-not-a-real-binary-xyz", &[]).is_err());
    }

    #[tokio::test]
    async fn test_fake_runner_replays_in_order() {
        let runner = fake::FakeRunner::with_responses(vec![fake::ok("first"), fake::failed(1, "nope")]);

        let first = runner.run("a", &[], Duration::ZERO).await.unwrap();
        let second = runner.run("b", &[String::from("x")], Duration::ZERO).await.unwrap();
        let third = runner.run("c", &[], Duration::ZERO).await.unwrap();

        assert_eq!(first.stdout, "first");
        assert!(!second.success);
        assert!(third.success);
        assert_eq!(runner.calls().len(), 3);
        assert_eq!(runner.calls()[1].args, vec![String::from("x")]);
    }
}
