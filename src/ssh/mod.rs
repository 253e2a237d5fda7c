//! Local SSH integration.
//!
//! This module provides:
//! - A command runner abstraction over `tokio::process`
//! - Known-hosts and SSH config registration for new pods
//! - The SSH connection test and the remote editor launch

mod connect;
mod registrar;
mod runner;

pub use connect::{ConnectionVerifier, SSH_TEST_MESSAGE};
pub use registrar::{
    ALIAS_PREFIX, ConnectionRegistrar, SSH_USER, SshConfigEntry, manual_ssh_command, ssh_alias,
};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};

#[cfg(test)]
pub(crate) use runner::fake;
