//! Credentials loaded once at startup.
//!
//! The API key comes from `RUNPOD_API_KEY` when set, otherwise from the key
//! file. The SSH public key is optional: a pod without it can still be
//! reached through keys registered on the account.

use std::path::Path;
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};

/// Environment variable that overrides the API key file.
pub const API_KEY_ENV: &str = "RUNPOD_API_KEY";

/// Secrets handed to the components that need them.
#[derive(Clone)]
pub struct Credentials {
    /// `RunPod` API key.
    pub api_key: String,
    /// SSH public key injected into new pods.
    pub public_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("public_key", &self.public_key.as_ref().map(|_| "<present>"))
            .finish()
    }
}

impl Credentials {
    /// Loads the API key and, if present, the SSH public key.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is available or the key file is empty.
    pub fn load(api_key_file: &Path, public_key_file: &Path) -> Result<Self> {
        let api_key = load_api_key(std::env::var(API_KEY_ENV).ok(), api_key_file)?;
        let public_key = read_public_key(public_key_file);
        Ok(Self { api_key, public_key })
    }

    /// Loads only the API key, for read-only account queries.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is available or the key file is empty.
    pub fn load_api_key_only(api_key_file: &Path) -> Result<Self> {
        let api_key = load_api_key(std::env::var(API_KEY_ENV).ok(), api_key_file)?;
        Ok(Self {
            api_key,
            public_key: None,
        })
    }
}

fn load_api_key(from_env: Option<String>, api_key_file: &Path) -> Result<String> {
    if let Some(key) = from_env.filter(|k| !k.trim().is_empty()) {
        debug!("Using API key from {API_KEY_ENV}");
        return Ok(key.trim().to_string());
    }

    if !api_key_file.exists() {
        return Err(ConfigError::file_not_found("API key file", api_key_file).into());
    }

    let key = std::fs::read_to_string(api_key_file)?.trim().to_string();
    if key.is_empty() {
        return Err(ConfigError::validation(
            format!("API key file {} is empty", api_key_file.display()),
            "paths.api_key_file",
        )
        .into());
    }

    Ok(key)
}

/// Reads a public key file, trimming whitespace. Missing or unreadable files
/// yield `None` with a warning.
#[must_use]
pub fn read_public_key(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => Some(content.trim().to_string()),
        Ok(_) => {
            warn!("SSH public key at {} is empty", path.display());
            None
        }
        Err(e) => {
            warn!("SSH public key not found at {} ({e})", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LaunchError;

    #[test]
    fn test_api_key_from_file_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let key_file = dir.path().join("key.txt");
        std::fs::write(&key_file, "  rp_secret\n").unwrap();

        assert_eq!(load_api_key(None, &key_file).unwrap(), "rp_secret");
    }

    #[test]
    fn test_env_key_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let key_file = dir.path().join("missing.txt");

        let key = load_api_key(Some(String::from("from-env")), &key_file).unwrap();
        assert_eq!(key, "from-env");
    }

    #[test]
    fn test_missing_key_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_api_key(None, &dir.path().join("missing.txt"));

        assert!(matches!(
            result,
            Err(LaunchError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_empty_key_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let key_file = dir.path().join("key.txt");
        std::fs::write(&key_file, "\n").unwrap();

        assert!(load_api_key(None, &key_file).is_err());
    }

    #[test]
    fn test_public_key_optional() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_public_key(&dir.path().join("id_rsa.pub")), None);

        let pub_file = dir.path().join("id_ed25519.pub");
        std::fs::write(&pub_file, "ssh-ed25519 AAAA op@host\n").unwrap();
        assert_eq!(
            read_public_key(&pub_file).as_deref(),
            Some("ssh-ed25519 AAAA op@host")
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let creds = Credentials {
            api_key: String::from("rp_secret"),
            public_key: None,
        };
        assert!(!format!("{creds:?}").contains("rp_secret"));
    }
}
