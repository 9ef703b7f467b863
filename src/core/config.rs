//! Configuration structures and types for package-release
//!
//! This module provides type-safe configuration management with serde support.
//! The configuration describes where and how to publish; what to publish comes
//! from the project manifest (see [`crate::project`]).

use serde::{Deserialize, Serialize};

/// Default registry API endpoint
pub const DEFAULT_REGISTRY_URL: &str = "https://localhost:4000/api";

/// Default HTTP timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PublishConfig {
    /// Registry endpoint settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryConfig>,

    /// Authentication settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// Publish options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishOptionsConfig>,
}

/// Registry endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RegistryConfig {
    /// Base URL of the registry API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Request timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Authentication configuration
///
/// Values may reference environment variables as `${VAR_NAME}`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .finish()
    }
}

/// Publish options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PublishOptionsConfig {
    /// Ask for confirmation before publishing (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm: Option<bool>,
}

impl PublishConfig {
    /// Registry URL with trailing slash removed
    pub fn registry_url(&self) -> String {
        self.registry
            .as_ref()
            .and_then(|r| r.url.as_deref())
            .unwrap_or(DEFAULT_REGISTRY_URL)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn timeout_secs(&self) -> u64 {
        self.registry
            .as_ref()
            .and_then(|r| r.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn confirm(&self) -> bool {
        self.publish
            .as_ref()
            .and_then(|p| p.confirm)
            .unwrap_or(true)
    }
}
