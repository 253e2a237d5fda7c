//! Configuration parser for loading and merging configuration files.
//!
//! Precedence, lowest to highest: compiled-in defaults, the YAML file,
//! `RUNPOD_LAUNCH_*` environment variables.

use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::LaunchConfig;

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["runpod-launch.yaml", "runpod-launch.yml"];

/// Configuration parser for loading launcher configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving the `.env` file.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving the `.env` file.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<LaunchConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::file_not_found("Configuration file", path).into());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<LaunchConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(LaunchConfig::default());
        }

        let config: LaunchConfig = serde_yaml::from_str(content).map_err(|e| {
            ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            }
        })?;

        Ok(config)
    }

    /// Loads the configuration file if one is given or discovered, else the defaults,
    /// then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing or any file fails to parse.
    pub fn load(&self, explicit: Option<&Path>) -> Result<LaunchConfig> {
        let mut config = match explicit {
            Some(path) => self.load_file(path)?,
            None => match find_config_file(".") {
                Some(path) => self.load_file(path)?,
                None => {
                    debug!("No configuration file found, using built-in defaults");
                    LaunchConfig::default()
                }
            },
        };

        Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        Ok(config)
    }

    /// Applies `RUNPOD_LAUNCH_*` overrides using the given variable lookup.
    pub fn apply_env_overrides(config: &mut LaunchConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup("RUNPOD_LAUNCH_ENDPOINT") {
            debug!("Overriding api.endpoint from environment");
            config.api.endpoint = endpoint;
        }

        if let Some(gpu) = lookup("RUNPOD_LAUNCH_GPU_TYPE") {
            debug!("Overriding pod.gpu_type_id from environment");
            config.pod.gpu_type_id = gpu;
        }

        if let Some(dc) = lookup("RUNPOD_LAUNCH_DATACENTER") {
            debug!("Overriding pod.data_center_id from environment");
            config.pod.data_center_id = dc;
        }

        if let Some(volume) = lookup("RUNPOD_LAUNCH_NETWORK_VOLUME") {
            debug!("Overriding pod.network_volume_id from environment");
            config.pod.network_volume_id = if volume.is_empty() { None } else { Some(volume) };
        }

        if let Some(template) = lookup("RUNPOD_LAUNCH_TEMPLATE") {
            debug!("Overriding pod.template_id from environment");
            config.pod.template_id = template;
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| ConfigError::ParseError {
                message: format!("Failed to load .env file: {e}"),
                location: Some(env_path.display().to_string()),
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Finds the configuration file in the given directory or its parents.
#[must_use]
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Option<PathBuf> {
    let mut current = start_dir.as_ref().to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Some(config_path);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CloudType;
    use std::collections::HashMap;

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let yaml = r#"
pod:
  gpu_type_id: "NVIDIA H100 80GB HBM3"
  gpu_count: 2
  cloud_type: COMMUNITY
  ports:
    - "22/tcp"
polling:
  interval_secs: 2
"#;
        let config = ConfigParser::new().parse_yaml(yaml, None).unwrap();

        assert_eq!(config.pod.gpu_type_id, "NVIDIA H100 80GB HBM3");
        assert_eq!(config.pod.gpu_count, 2);
        assert_eq!(config.pod.cloud_type, CloudType::Community);
        assert_eq!(config.pod.ports_string(), "22/tcp");
        assert_eq!(config.pod.template_id, "runpod-torch-v240");
        assert_eq!(config.polling.interval_secs, 2);
        assert_eq!(config.polling.boot_attempts, 60);
        assert_eq!(config.editor.command, "code");
    }

    #[test]
    fn test_parse_empty_is_default() {
        let config = ConfigParser::new().parse_yaml("  \n", None).unwrap();
        assert_eq!(config, LaunchConfig::default());
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = ConfigParser::new().parse_yaml("pod: [unterminated", None);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigParser::new().load_file(dir.path().join("nope.yaml"));
        assert!(matches!(
            result,
            Err(crate::error::LaunchError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_find_config_file_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("runpod-launch.yaml"), "").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("runpod-launch.yaml"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("RUNPOD_LAUNCH_DATACENTER", "EU-RO-1"),
            ("RUNPOD_LAUNCH_NETWORK_VOLUME", ""),
        ]);
        let mut config = LaunchConfig::default();

        ConfigParser::apply_env_overrides(&mut config, |name| {
            vars.get(name).map(|v| (*v).to_string())
        });

        assert_eq!(config.pod.data_center_id, "EU-RO-1");
        assert_eq!(config.pod.network_volume_id, None);
        assert_eq!(config.pod.gpu_type_id, "NVIDIA A100 80GB PCIe");
    }
}
