//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered in order:
//! `telemetry-relay.toml`, `telemetry-relay.<environment>.toml`, then
//! `TELEMETRY_RELAY__SECTION__FIELD` environment variables.

use super::error::{ConfigResult, ConfigurationError};
use super::RelayConfig;
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_FILE_STEM: &str = "telemetry-relay";
const ENV_PREFIX: &str = "TELEMETRY_RELAY";

/// Loaded, validated configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: RelayConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Process environment variables still apply on top.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_sources(config_dir, environment, None)
    }

    /// Load configuration with an explicit variable map standing in for the
    /// process environment
    pub fn load_with_env_vars(
        config_dir: Option<PathBuf>,
        environment: &str,
        vars: config::Map<String, String>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_sources(config_dir, environment, Some(vars))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: RelayConfig, environment: &str) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from("config"),
        }))
    }

    fn load_with_sources(
        config_dir: Option<PathBuf>,
        environment: &str,
        vars: Option<config::Map<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = match config_dir {
            Some(dir) if !dir.is_dir() => {
                return Err(ConfigurationError::config_file_not_found(vec![dir]));
            }
            Some(dir) => dir,
            None => Self::default_config_directory(),
        };

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let base_file = config_directory.join(format!("{BASE_FILE_STEM}.toml"));
        let env_file = config_directory.join(format!("{BASE_FILE_STEM}.{environment}.toml"));

        let env_source = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("gating.trusted_senders")
            .source(vars);

        let built = Config::builder()
            .add_source(File::from(base_file.as_path()).format(FileFormat::Toml).required(false))
            .add_source(File::from(env_file.as_path()).format(FileFormat::Toml).required(false))
            .add_source(env_source)
            .build()
            .map_err(|e| ConfigurationError::invalid_source(base_file.display().to_string(), e))?;

        let config: RelayConfig = built.try_deserialize().map_err(|e| {
            ConfigurationError::environment_config_error(
                environment,
                format!("Failed to deserialize configuration: {e}"),
            )
        })?;

        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&Self::sanitize_config_for_logging(&config))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        info!(
            environment = %environment,
            base_file_present = base_file.exists(),
            env_file_present = env_file.exists(),
            companion_node = %config.companion.node_id,
            trusted_senders = config.gating.trusted_senders.len(),
            "Configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Configuration as JSON with sender identifiers masked
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment: TELEMETRY_RELAY_ENV || APP_ENV || 'development'
    pub fn detect_environment() -> String {
        env::var("TELEMETRY_RELAY_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        if let Ok(dir) = env::var("TELEMETRY_RELAY_CONFIG_DIR") {
            return PathBuf::from(dir);
        }

        if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
            let candidate = PathBuf::from(manifest_dir).join("config");
            if candidate.is_dir() {
                return candidate;
            }
        }

        PathBuf::from("config")
    }

    /// Phone numbers are personal data; keep only enough to tell entries apart
    fn sanitize_config_for_logging(config: &RelayConfig) -> serde_json::Value {
        let mut value = serde_json::json!(config);
        if let Some(senders) = value
            .pointer_mut("/gating/trusted_senders")
            .and_then(|v| v.as_array_mut())
        {
            for sender in senders.iter_mut() {
                if let Some(s) = sender.as_str() {
                    *sender = serde_json::Value::String(mask_identifier(s));
                }
            }
        }
        value
    }
}

fn mask_identifier(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    if chars.len() > 4 {
        let head: String = chars[..2].iter().collect();
        let tail: String = chars[chars.len() - 2..].iter().collect();
        format!("[MASKED: {head}***{tail}]")
    } else {
        "[MASKED]".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::load_with_env_vars(
            Some(dir.path().to_path_buf()),
            "test",
            config::Map::new(),
        )
        .unwrap();
        assert_eq!(manager.config(), &RelayConfig::default());
        assert_eq!(manager.environment(), "test");
    }

    #[test]
    fn environment_file_overrides_base_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("telemetry-relay.toml"),
            "[companion]\nmax_attempts = 4\nattempt_timeout_ms = 2000\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("telemetry-relay.test.toml"),
            "[companion]\nattempt_timeout_ms = 4000\n",
        )
        .unwrap();

        let manager = ConfigManager::load_with_env_vars(
            Some(dir.path().to_path_buf()),
            "test",
            config::Map::new(),
        )
        .unwrap();
        assert_eq!(manager.config().companion.max_attempts, 4);
        assert_eq!(manager.config().companion.attempt_timeout_ms, 4000);
    }

    #[test]
    fn environment_variables_override_files() {
        let dir = TempDir::new().unwrap();
        let mut vars = config::Map::new();
        vars.insert(
            "TELEMETRY_RELAY__GATING__MIN_INTERVAL_SECONDS".to_string(),
            "120".to_string(),
        );
        vars.insert(
            "TELEMETRY_RELAY__GATING__TRUSTED_SENDERS".to_string(),
            "+15551230000,+15559870000".to_string(),
        );

        let manager =
            ConfigManager::load_with_env_vars(Some(dir.path().to_path_buf()), "test", vars).unwrap();
        assert_eq!(manager.config().gating.min_interval_seconds, 120);
        assert_eq!(
            manager.config().gating.trusted_senders,
            vec!["+15551230000".to_string(), "+15559870000".to_string()]
        );
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("telemetry-relay.toml"),
            "[companion]\nmax_attempts = 0\n",
        )
        .unwrap();

        let result = ConfigManager::load_with_env_vars(
            Some(dir.path().to_path_buf()),
            "test",
            config::Map::new(),
        );
        assert!(matches!(result, Err(ConfigurationError::InvalidValue { .. })));
    }

    #[test]
    fn explicit_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent");
        let result = ConfigManager::load_with_env_vars(Some(missing), "test", config::Map::new());
        assert!(matches!(
            result,
            Err(ConfigurationError::ConfigFileNotFound { .. })
        ));
    }

    #[test]
    fn debug_config_masks_trusted_senders() {
        let mut config = RelayConfig::default();
        config.gating.trusted_senders = vec!["+15551230000".to_string()];
        let manager = ConfigManager::from_config(config, "test").unwrap();

        let rendered = manager.debug_config().to_string();
        assert!(!rendered.contains("+15551230000"));
        assert!(rendered.contains("[MASKED: +1***00]"));
    }
}
