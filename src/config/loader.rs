//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles YAML file discovery, environment detection,
//! environment section merging and `${VAR}` expansion.

use super::{ConfigResult, ConfigurationError, RecordsConfig};
use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

const ENVIRONMENT_SECTIONS: [&str; 3] = ["development", "test", "production"];

/// Loaded configuration together with where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: RecordsConfig,
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

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = environment,
            config_directory = %config_directory.display(),
            "Loading records configuration"
        );

        let mut config = Self::load_and_merge_config(&config_directory, environment)?;
        Self::expand_environment_variables(&mut config)?;
        config.validate()?;

        info!(
            environment = environment,
            page_size = config.pagination.page_size,
            circuit_breakers_enabled = config.circuit_breakers.enabled,
            component_configs = config.circuit_breakers.component_configs.len(),
            max_connections = config.database.max_connections,
            "⚙️ Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &RecordsConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("RECORDS_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        if let Ok(dir) = env::var("RECORDS_CONFIG_DIR") {
            return PathBuf::from(dir);
        }

        if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
            let dir = PathBuf::from(manifest_dir).join("config");
            if dir.exists() {
                return dir;
            }
        }

        PathBuf::from("config")
    }

    /// Safely read a configuration file with size limits
    fn read_config_file_safely(path: &Path) -> ConfigResult<String> {
        const MAX_CONFIG_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB limit

        let metadata = std::fs::metadata(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))?;

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigurationError::invalid_value(
                "file_size",
                metadata.len().to_string(),
                format!(
                    "Configuration file too large ({}MB > {}MB limit)",
                    metadata.len() / (1024 * 1024),
                    MAX_CONFIG_FILE_SIZE / (1024 * 1024)
                ),
            ));
        }

        if !metadata.is_file() {
            return Err(ConfigurationError::invalid_value(
                "file_type",
                "directory or special file",
                "Configuration path must point to a regular file",
            ));
        }

        std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
    }

    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let mut searched_paths = Vec::new();

        for name in ["records-config.yaml", "records-config.yml"] {
            let config_path = config_directory.join(name);
            searched_paths.push(config_path.clone());

            if config_path.exists() {
                debug!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        Err(ConfigurationError::config_file_not_found(searched_paths))
    }

    /// Load and merge configuration with environment-specific overrides
    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<RecordsConfig> {
        let config_file = Self::find_config_file(config_directory)?;
        let yaml_content = Self::read_config_file_safely(&config_file)?;
        Self::parse_config(&yaml_content, environment)
            .map_err(|e| ConfigurationError::invalid_yaml(config_file.display().to_string(), e))
    }

    /// Parse YAML text and apply the section for `environment`
    pub fn parse_config(yaml_content: &str, environment: &str) -> Result<RecordsConfig, String> {
        let mut yaml_data: YamlValue =
            serde_yaml::from_str(yaml_content).map_err(|e| e.to_string())?;

        if let Some(env_overrides) = yaml_data
            .get(YamlValue::String(environment.to_string()))
            .cloned()
        {
            debug!(environment = environment, "Applying environment-specific overrides");
            Self::merge_yaml_values(&mut yaml_data, env_overrides);
        } else if !ENVIRONMENT_SECTIONS.contains(&environment) {
            warn!(environment = environment, "Unknown environment, using base configuration");
        }

        // Remove environment sections to avoid confusion
        if let YamlValue::Mapping(ref mut map) = yaml_data {
            for section in ENVIRONMENT_SECTIONS {
                map.remove(YamlValue::String(section.to_string()));
            }
        }

        let mut config: RecordsConfig = serde_yaml::from_value(yaml_data)
            .map_err(|e| format!("Failed to deserialize configuration: {e}"))?;
        config.environment = environment.to_string();

        Ok(config)
    }

    /// Recursively merge YAML values (environment overrides into base config)
    fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) {
        match (&mut *base, override_value) {
            (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
                for (key, value) in override_map {
                    if let Some(existing_value) = base_map.get_mut(&key) {
                        Self::merge_yaml_values(existing_value, value);
                    } else {
                        base_map.insert(key, value);
                    }
                }
            }
            (base_ref, override_val) => {
                *base_ref = override_val;
            }
        }
    }

    /// Expand `${VAR}` references in the database URL
    fn expand_environment_variables(config: &mut RecordsConfig) -> ConfigResult<()> {
        let url = &mut config.database.url;
        if url.starts_with("${") && url.ends_with('}') {
            let var_name = url[2..url.len() - 1].to_string();
            match env::var(&var_name) {
                Ok(env_value) => {
                    debug!(variable = %var_name, "Expanding environment variable in database URL");
                    *url = env_value;
                }
                Err(_) => {
                    return Err(ConfigurationError::environment_variable_error(
                        var_name,
                        "database.url references an unset environment variable",
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Global configuration singleton for easy access throughout the application
static GLOBAL_CONFIG: OnceLock<Arc<ConfigManager>> = OnceLock::new();

impl ConfigManager {
    /// Get or initialize the global configuration instance, falling back to defaults
    pub fn global() -> Arc<ConfigManager> {
        GLOBAL_CONFIG
            .get_or_init(|| {
                ConfigManager::load().unwrap_or_else(|e| {
                    warn!("Configuration loading failed, using defaults: {e}");
                    let environment = Self::detect_environment();
                    Arc::new(ConfigManager {
                        config: RecordsConfig {
                            environment: environment.clone(),
                            ..Default::default()
                        },
                        environment,
                        config_directory: PathBuf::from("config"),
                    })
                })
            })
            .clone()
    }
}
