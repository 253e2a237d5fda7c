//! Configuration module for the pod launcher.
//!
//! This module handles all configuration-related functionality:
//! - Compiled-in defaults and the optional `runpod-launch.yaml` override file
//! - Environment overrides and `.env` loading
//! - Credential loading
//! - Validation of configuration values

mod credentials;
mod parser;
mod spec;
mod validator;

pub use credentials::{API_KEY_ENV, Credentials, read_public_key};
pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use spec::{
    ApiConfig, CloudType, EditorConfig, LaunchConfig, PathsConfig, PodProfile, PollingConfig,
    PortConfig, PortProtocol, ResolvedPaths,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
