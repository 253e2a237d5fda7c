// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # runpod-launch
//!
//! Starts a single `RunPod` GPU pod and hands it over to a local editor.
//!
//! ## Overview
//!
//! One launch runs these steps in order:
//!
//! - Deploy a pod from a [`config::PodProfile`] through the GraphQL API
//! - Poll until the pod has a runtime, then until it exposes port 22
//! - Add the pod's host key to known-hosts and an alias to the SSH config
//! - Test the connection and open the editor on the pod
//!
//! The account can also be queried for its network volumes and its
//! registered SSH public key.
//!
//! ## Modules
//!
//! - [`config`]: Configuration, credentials and validation
//! - [`runpod`]: `RunPod` API client, inventory, provisioning and polling
//! - [`ssh`]: Known-hosts and SSH config registration, connection test
//! - [`workflow`]: The end-to-end launch
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! pod:
//!   gpu_type_id: "NVIDIA A100 80GB PCIe"
//!   data_center_id: CA-MTL-3
//!   network_volume_id: null
//!   volume_in_gb: 50
//! editor:
//!   start_dir: /workspace
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod runpod;
pub mod ssh;
pub mod workflow;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, Credentials, LaunchConfig};
pub use error::{LaunchError, Result};
pub use runpod::{Inventory, PodProvisioner, ReadinessPoller, RunPodClient};
pub use ssh::{CommandRunner, ConnectionRegistrar, ConnectionVerifier, SystemRunner};
pub use workflow::{LaunchOutcome, Launcher};
