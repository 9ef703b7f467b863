//! Core traits and types for release publishing
//!
//! This module defines the seams between the publication protocol and its
//! collaborators: the registry API, the archive builder and the operator
//! console. Production implementations live in `registry` and
//! `orchestration::console`; tests substitute in-process mocks.

use crate::core::error::PublishResult;
use crate::registry::credentials::Credentials;
use crate::release::metadata::Metadata;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Protocol stages
// ============================================================================

/// Remote step of the publication protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStage {
    PackageUpsert,
    ReleaseUpload,
    Revert,
}

impl PublishStage {
    /// Human-readable description used in operator reports
    pub fn describe(&self) -> &'static str {
        match self {
            PublishStage::PackageUpsert => "Updating package",
            PublishStage::ReleaseUpload => "Pushing release",
            PublishStage::Revert => "Reverting release",
        }
    }
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishStage::PackageUpsert => write!(f, "package_upsert"),
            PublishStage::ReleaseUpload => write!(f, "release_upload"),
            PublishStage::Revert => write!(f, "revert"),
        }
    }
}

// ============================================================================
// Registry responses
// ============================================================================

/// Raw response of a registry call: numeric status plus decoded body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// A response whose status was not one of the accepted codes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub status: u16,
    pub body: serde_json::Value,
}

impl RegistryResponse {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    /// Split the response into success payload or rejection
    ///
    /// Any status outside `accepted` is a rejection, whatever the body says.
    ///
    /// # Examples
    ///
    /// ```
    /// use package_release::core::RegistryResponse;
    ///
    /// let response = RegistryResponse::new(201, serde_json::json!({"name": "ecto"}));
    /// assert!(response.clone().accept(&[200, 201]).is_ok());
    /// assert!(response.accept(&[204]).is_err());
    /// ```
    pub fn accept(self, accepted: &[u16]) -> Result<serde_json::Value, Rejection> {
        if accepted.contains(&self.status) {
            Ok(self.body)
        } else {
            Err(Rejection {
                status: self.status,
                body: self.body,
            })
        }
    }
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Registry API used by the publication protocol
///
/// Implementations return every HTTP status as a [`RegistryResponse`];
/// `Err` is reserved for transport failures.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Create the package record if absent, update it otherwise
    async fn upsert_package(
        &self,
        name: &str,
        metadata: &Metadata,
        credentials: &Credentials,
    ) -> PublishResult<RegistryResponse>;

    /// Upload the release archive for a package version
    async fn upload_release(
        &self,
        name: &str,
        version: &str,
        archive: Vec<u8>,
        credentials: &Credentials,
    ) -> PublishResult<RegistryResponse>;

    /// Delete a previously published release
    async fn delete_release(
        &self,
        name: &str,
        version: &str,
        credentials: &Credentials,
    ) -> PublishResult<RegistryResponse>;
}

/// Builds the binary content package for a release
pub trait ArchiveBuilder: Send + Sync {
    fn build(&self, metadata: &Metadata, files: &[String]) -> PublishResult<Vec<u8>>;
}

/// Operator-facing console
#[async_trait]
pub trait Console: Send + Sync {
    /// Show the report and ask the operator to proceed
    async fn confirm(&self, report: &[String]) -> PublishResult<bool>;

    /// Show a registry rejection
    fn report_error(&self, stage: PublishStage, status: u16, body: &serde_json::Value);

    /// Show a progress line
    fn info(&self, line: &str);
}
