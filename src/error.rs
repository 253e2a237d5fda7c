//! Error types for the pod launcher.
//!
//! Errors are split by where they originate: local configuration and
//! credentials, the `RunPod` API, and local I/O. Polling treats API errors as
//! transient; everything else is fatal to the workflow.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the launcher.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// `RunPod` API errors.
    #[error("RunPod API error: {0}")]
    RunPod(#[from] RunPodError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A pod was created but never became reachable. It keeps running and
    /// is billed until stopped.
    #[error("Pod {pod_id} was created but is not reachable: {source}")]
    PodUnreachable {
        /// ID of the created pod.
        pod_id: String,
        /// Why the pod is not reachable.
        #[source]
        source: Box<LaunchError>,
    },

    /// The operator interrupted the run.
    #[error("Operation cancelled by user")]
    Interrupted,
}

/// Configuration and credential errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required file was not found.
    #[error("{what} not found at {path}")]
    FileNotFound {
        /// What the file was supposed to contain.
        what: String,
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// The home directory could not be determined.
    #[error("Cannot determine home directory")]
    NoHomeDir,
}

/// `RunPod` API errors.
#[derive(Debug, Error)]
pub enum RunPodError {
    /// The API answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// The API answered with a GraphQL `errors` list.
    #[error("GraphQL errors: {}", .errors.join("; "))]
    Remote {
        /// Error messages reported by the service.
        errors: Vec<String>,
    },

    /// Network error.
    #[error("Network error communicating with RunPod: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from RunPod API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// Pod not found.
    #[error("Pod not found: {pod_id}")]
    PodNotFound {
        /// ID of the missing pod.
        pod_id: String,
    },

    /// A polling phase ran out of attempts.
    #[error("Timed out during {phase} after {attempts} attempts")]
    Timeout {
        /// Name of the polling phase.
        phase: String,
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Result type alias for launcher operations.
pub type Result<T> = std::result::Result<T, LaunchError>;

impl LaunchError {
    /// Returns true if this error should be retried by a polling loop.
    ///
    /// Timeouts, configuration and I/O errors are never transient.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RunPod(
                RunPodError::Transport { .. }
                    | RunPodError::Remote { .. }
                    | RunPodError::NetworkError { .. }
                    | RunPodError::InvalidResponse { .. }
                    | RunPodError::PodNotFound { .. }
            )
        )
    }

    /// Returns true if this error is a polling timeout, directly or as the
    /// cause of an unreachable pod.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::RunPod(RunPodError::Timeout { .. }) => true,
            Self::PodUnreachable { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Returns the ID of a pod left running by this error, if any.
    #[must_use]
    pub fn pod_id(&self) -> Option<&str> {
        match self {
            Self::PodUnreachable { pod_id, .. } => Some(pod_id),
            _ => None,
        }
    }

    /// Wraps an error raised after `pod_id` was created.
    #[must_use]
    pub fn unreachable(pod_id: impl Into<String>, source: Self) -> Self {
        Self::PodUnreachable {
            pod_id: pod_id.into(),
            source: Box::new(source),
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a missing-file error.
    #[must_use]
    pub fn file_not_found(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound {
            what: what.into(),
            path: path.into(),
        }
    }
}

impl RunPodError {
    /// Creates a transport error.
    #[must_use]
    pub fn transport(status: u16, body: impl Into<String>) -> Self {
        Self::Transport {
            status,
            body: body.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
