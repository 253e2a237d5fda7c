//! Configuration validation.
//!
//! Catches profiles that would deploy a pod the workflow can never reach
//! before any billable call is made.

use crate::error::{ConfigError, Result};
use tracing::debug;

use super::spec::{LaunchConfig, PodProfile, PollingConfig};

/// Validator for launcher configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a launcher configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate(&self, config: &LaunchConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_api(config, &mut result);
        Self::validate_pod(&config.pod, &mut result);
        Self::validate_polling(&config.polling, &mut result);

        if config.editor.enabled && config.editor.command.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("editor.command"),
                message: String::from("Editor command cannot be empty when the editor is enabled"),
            });
        }

        if let Some(first_error) = result.errors.first() {
            return Err(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )
            .into());
        }

        debug!("Configuration validation passed");
        Ok(result)
    }

    fn validate_api(config: &LaunchConfig, result: &mut ValidationResult) {
        let endpoint = &config.api.endpoint;
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            result.errors.push(ValidationError {
                field: String::from("api.endpoint"),
                message: format!("API endpoint '{endpoint}' must be an http(s) URL"),
            });
        } else if endpoint.starts_with("http://") {
            result
                .warnings
                .push(String::from("API endpoint is not HTTPS; the API key is sent in clear text"));
        }
    }

    fn validate_pod(pod: &PodProfile, result: &mut ValidationResult) {
        if pod.gpu_count == 0 {
            result.errors.push(ValidationError {
                field: String::from("pod.gpu_count"),
                message: String::from("GPU count must be at least 1"),
            });
        }

        for (field, value) in [
            ("pod.gpu_type_id", &pod.gpu_type_id),
            ("pod.template_id", &pod.template_id),
            ("pod.data_center_id", &pod.data_center_id),
            ("pod.name_prefix", &pod.name_prefix),
        ] {
            if value.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: String::from(field),
                    message: format!("{field} cannot be empty"),
                });
            }
        }

        if !pod.exposes_ssh() {
            result.errors.push(ValidationError {
                field: String::from("pod.ports"),
                message: String::from("Ports must include 22/tcp so the pod can be reached over SSH"),
            });
        }

        if !pod.support_public_ip {
            result.warnings.push(String::from(
                "Public IP is disabled; the SSH port may never get a directly reachable address",
            ));
        }

        if pod.network_volume_id.is_some() && pod.volume_in_gb > 0 {
            result.warnings.push(String::from(
                "Both a network volume and a pod volume are configured",
            ));
        }
    }

    fn validate_polling(polling: &PollingConfig, result: &mut ValidationResult) {
        if polling.boot_attempts == 0 {
            result.errors.push(ValidationError {
                field: String::from("polling.boot_attempts"),
                message: String::from("Boot attempts must be at least 1"),
            });
        }

        if polling.port_attempts == 0 {
            result.errors.push(ValidationError {
                field: String::from("polling.port_attempts"),
                message: String::from("Port attempts must be at least 1"),
            });
        }
    }
}
