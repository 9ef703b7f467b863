//! Error handling for release publishing
//!
//! This module provides the error type shared by every stage of the release
//! pipeline, with stable codes and recovery guidance for the operator.
//! Registry rejections are not errors: they are reported as
//! [`PublishOutcome::Failed`](crate::orchestration::PublishOutcome).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for release publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    #[error("project manifest not found: {}", path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("required field `{field}` is missing from the project manifest")]
    MissingField { field: String },

    #[error("invalid version `{version}`: {message}")]
    InvalidVersion { version: String, message: String },

    #[error("dependency `{name}` is marked as override and cannot be published as a requirement")]
    OverriddenDependency { name: String },

    #[error("no registry credentials configured")]
    CredentialsMissing,

    // Local failures
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build release archive: {message}")]
    Archive { message: String },

    // Transport errors
    #[error("network error: {message}")]
    Network { message: String },

    // Protocol errors
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

/// Convenience alias used across the crate
pub type PublishResult<T> = Result<T, PublishError>;

impl PublishError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check whether the error was detected before anything was sent to the registry
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::ManifestNotFound { .. }
                | Self::MissingField { .. }
                | Self::InvalidVersion { .. }
                | Self::OverriddenDependency { .. }
                | Self::CredentialsMissing
        )
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::Config(_) => vec!["Check .package-release.yaml and project.toml for typos"],
            Self::ManifestNotFound { .. } => vec![
                "Run the command from the project root",
                "Pass the project path as an argument",
            ],
            Self::MissingField { .. } => {
                vec!["Add the field to the [project] table of project.toml"]
            }
            Self::InvalidVersion { .. } => {
                vec!["Use a semantic version such as 1.0.0"]
            }
            Self::OverriddenDependency { .. } => vec![
                "Remove `override = true` from the dependency",
                "Overridden dependencies cannot be fixed requirements of a release",
            ],
            Self::CredentialsMissing => vec![
                "Set PACKAGE_RELEASE_API_KEY",
                "Or configure auth.username and auth.password in .package-release.yaml",
            ],
            Self::Io { .. } => vec!["Check that the file exists and is readable"],
            Self::Archive { .. } => vec!["Check that every included file is readable"],
            Self::Network { .. } => vec![
                "Check your internet connection",
                "Check the registry URL",
            ],
            Self::InvalidTransition { .. } => vec!["This is a bug, please report it"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::ManifestNotFound { .. } => "MANIFEST_NOT_FOUND",
            Self::MissingField { .. } => "MISSING_FIELD",
            Self::InvalidVersion { .. } => "INVALID_VERSION",
            Self::OverriddenDependency { .. } => "OVERRIDDEN_DEPENDENCY",
            Self::CredentialsMissing => "CREDENTIALS_MISSING",
            Self::Io { .. } => "IO_ERROR",
            Self::Archive { .. } => "ARCHIVE_FAILED",
            Self::Network { .. } => "NETWORK_ERROR",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
        }
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}
