//! Configuration file loader for package-release
//!
//! This module provides configuration loading, validation, and merging capabilities.

use super::config::*;
use crate::core::error::PublishError;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".package-release.yaml";

lazy_static! {
    /// Environment variable reference (${VAR_NAME})
    static ref ENV_VAR_REGEX: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Configuration load options
#[derive(Debug, Clone)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// CLI arguments (highest priority)
    pub cli_args: Option<PublishConfig>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "registry.url")
    pub field: String,

    /// Error message
    pub message: String,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Project config (./.package-release.yaml)
    /// 4. Global config ($HOME/.package-release.yaml)
    /// 5. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PublishConfig, PublishError> {
        let mut configs: Vec<PublishConfig> = Vec::new();

        // 5. Default values (lowest priority)
        configs.push(PublishConfig::default());

        // 4. Global config
        if let Some(home_dir) = options.env.get("HOME")
            && let Some(global_config) =
                Self::load_config_file(&PathBuf::from(home_dir).join(CONFIG_FILENAME)).await?
        {
            configs.push(global_config);
        }

        // 3. Project config
        if let Some(project_config) =
            Self::load_config_file(&options.project_path.join(CONFIG_FILENAME)).await?
        {
            configs.push(project_config);
        }

        // 2. Environment variables
        if let Some(env_config) = Self::load_env_config(&options.env) {
            configs.push(env_config);
        }

        // 1. CLI arguments (highest priority)
        if let Some(cli_config) = options.cli_args {
            configs.push(cli_config);
        }

        let merged_config = Self::merge_configs(configs);
        let expanded_config = Self::expand_env_vars(merged_config, &options.env);

        let errors = Self::validate(&expanded_config);
        if let Some(first) = errors.first() {
            return Err(PublishError::Config(format!(
                "{}: {}",
                first.field, first.message
            )));
        }

        Ok(expanded_config)
    }

    /// Load configuration from YAML file, `None` if it does not exist
    async fn load_config_file(file_path: &Path) -> Result<Option<PublishConfig>, PublishError> {
        if !file_path.exists() {
            return Ok(None);
        }

        debug!(path = %file_path.display(), "loading configuration file");

        let content = fs::read_to_string(file_path)
            .await
            .map_err(|e| PublishError::io(file_path, e))?;

        let config: PublishConfig = serde_yaml::from_str(&content).map_err(|e| {
            PublishError::Config(format!(
                "failed to parse {}: {}",
                file_path.display(),
                e
            ))
        })?;

        Ok(Some(config))
    }

    /// Load configuration from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Option<PublishConfig> {
        let mut config = PublishConfig::default();
        let mut has_changes = false;

        // PACKAGE_RELEASE_URL -> registry.url
        if let Some(url) = env.get("PACKAGE_RELEASE_URL") {
            config.registry = Some(RegistryConfig {
                url: Some(url.clone()),
                timeout_secs: None,
            });
            has_changes = true;
        }

        // PACKAGE_RELEASE_API_KEY / _USERNAME / _PASSWORD -> auth
        let api_key = env.get("PACKAGE_RELEASE_API_KEY").cloned();
        let username = env.get("PACKAGE_RELEASE_USERNAME").cloned();
        let password = env.get("PACKAGE_RELEASE_PASSWORD").cloned();
        if api_key.is_some() || username.is_some() || password.is_some() {
            config.auth = Some(AuthConfig {
                username,
                password,
                api_key,
            });
            has_changes = true;
        }

        // PACKAGE_RELEASE_NO_CONFIRM -> publish.confirm
        if env.get("PACKAGE_RELEASE_NO_CONFIRM").map(|s| s.as_str()) == Some("true") {
            config.publish = Some(PublishOptionsConfig {
                confirm: Some(false),
            });
            has_changes = true;
        }

        if has_changes { Some(config) } else { None }
    }

    /// Merge multiple configurations, later entries win
    fn merge_configs(configs: Vec<PublishConfig>) -> PublishConfig {
        let mut result = PublishConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target, field by field
    fn merge_into(target: &mut PublishConfig, source: PublishConfig) {
        if let Some(source_registry) = source.registry {
            let target_registry = target.registry.get_or_insert_with(RegistryConfig::default);
            if source_registry.url.is_some() {
                target_registry.url = source_registry.url;
            }
            if source_registry.timeout_secs.is_some() {
                target_registry.timeout_secs = source_registry.timeout_secs;
            }
        }

        if let Some(source_auth) = source.auth {
            let target_auth = target.auth.get_or_insert_with(AuthConfig::default);
            if source_auth.username.is_some() {
                target_auth.username = source_auth.username;
            }
            if source_auth.password.is_some() {
                target_auth.password = source_auth.password;
            }
            if source_auth.api_key.is_some() {
                target_auth.api_key = source_auth.api_key;
            }
        }

        if let Some(source_publish) = source.publish {
            let target_publish = target.publish.get_or_insert_with(PublishOptionsConfig::default);
            if source_publish.confirm.is_some() {
                target_publish.confirm = source_publish.confirm;
            }
        }
    }

    /// Expand `${VAR}` references in authentication values
    fn expand_env_vars(mut config: PublishConfig, env: &HashMap<String, String>) -> PublishConfig {
        if let Some(auth) = &mut config.auth {
            for value in [&mut auth.username, &mut auth.password, &mut auth.api_key]
                .into_iter()
                .flatten()
            {
                *value = Self::expand_string(value, env);
            }
        }

        config
    }

    /// Expand environment variables in a single string
    ///
    /// Unknown variables are left untouched.
    fn expand_string(input: &str, env: &HashMap<String, String>) -> String {
        let mut result = input.to_string();

        for cap in ENV_VAR_REGEX.captures_iter(input) {
            let var_name = &cap[1];

            match env.get(var_name) {
                Some(value) => {
                    result = result.replace(&format!("${{{}}}", var_name), value);
                }
                None => warn!(variable = var_name, "environment variable not found"),
            }
        }

        result
    }

    /// Validate configuration
    pub fn validate(config: &PublishConfig) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        let url = config.registry_url();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ConfigValidationError {
                field: "registry.url".to_string(),
                message: format!("expected an http(s) URL, got `{}`", url),
            });
        }

        if config.timeout_secs() == 0 {
            errors.push(ConfigValidationError {
                field: "registry.timeout_secs".to_string(),
                message: "timeout must be greater than zero".to_string(),
            });
        }

        errors
    }
}
