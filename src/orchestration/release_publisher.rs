//! Release Publisher - drives the publication protocol
//!
//! Manages one publish or revert run:
//! - dependency classification and override check
//! - metadata assembly and the operator report
//! - confirmation
//! - package upsert, archive build, release upload
//! - release revert
//!
//! Everything that can fail locally is checked before the first registry
//! call. Registry rejections end the run with [`PublishOutcome::Failed`];
//! nothing is retried or rolled back.

use serde::Serialize;

use crate::core::error::PublishResult;
use crate::core::state_machine::{PublishState, PublishStateMachine};
use crate::core::traits::{ArchiveBuilder, Console, PublishStage, Rejection, RegistryApi};
use crate::project::Project;
use crate::registry::credentials::Credentials;
use crate::release::dependencies::DependencyClassifier;
use crate::release::metadata::{Metadata, assemble};
use crate::release::report::render;

/// Status codes accepted for package upsert and release upload
pub const UPLOAD_SUCCESS: &[u16] = &[200, 201];

/// Status code accepted for release deletion
pub const REVERT_SUCCESS: &[u16] = &[204];

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PublishOutcome {
    Published {
        version: String,
    },
    Reverted {
        version: String,
    },
    Failed {
        stage: PublishStage,
        status: u16,
        body: serde_json::Value,
    },
    /// The operator declined the report
    Cancelled,
}

impl PublishOutcome {
    /// Whether the command should exit successfully
    pub fn is_success(&self) -> bool {
        !matches!(self, PublishOutcome::Failed { .. })
    }
}

/// Release metadata ready for review
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRelease {
    pub metadata: Metadata,
    /// Dependencies left out of the release, by name
    pub excluded: Vec<String>,
}

impl PreparedRelease {
    /// Classify dependencies and assemble metadata for a project
    ///
    /// Fails if an included dependency is an override.
    pub fn from_project(project: &Project) -> PublishResult<Self> {
        Self::with_classifier(project, &DependencyClassifier::default())
    }

    pub fn with_classifier(
        project: &Project,
        classifier: &DependencyClassifier,
    ) -> PublishResult<Self> {
        let classification = classifier.classify(&project.dependencies);
        classification.check_overrides()?;

        let metadata = assemble(
            &project.config,
            project.package.as_ref(),
            classification.requirements(),
            &project.root,
        )?;

        Ok(Self {
            metadata,
            excluded: classification.exclude,
        })
    }

    /// Report lines shown before publishing
    pub fn report(&self) -> Vec<String> {
        render(&self.metadata, &self.excluded)
    }
}

/// Runs the publication protocol against a registry
pub struct ReleasePublisher<'a> {
    registry: &'a dyn RegistryApi,
    archiver: &'a dyn ArchiveBuilder,
    console: &'a dyn Console,
    state: PublishStateMachine,
}

impl<'a> ReleasePublisher<'a> {
    pub fn new(
        registry: &'a dyn RegistryApi,
        archiver: &'a dyn ArchiveBuilder,
        console: &'a dyn Console,
    ) -> Self {
        Self {
            registry,
            archiver,
            console,
            state: PublishStateMachine::new(),
        }
    }

    /// State machine of the current run
    pub fn state(&self) -> &PublishStateMachine {
        &self.state
    }

    /// Publish the project's current version
    ///
    /// The report always goes through [`Console::confirm`]; a declined report
    /// ends the run with [`PublishOutcome::Cancelled`].
    pub async fn publish(
        &mut self,
        project: &Project,
        credentials: &Credentials,
    ) -> PublishResult<PublishOutcome> {
        let prepared = PreparedRelease::from_project(project)?;

        if !self.console.confirm(&prepared.report()).await? {
            self.state.transition(PublishState::Cancelled)?;
            self.console.info("Publication cancelled");
            return Ok(PublishOutcome::Cancelled);
        }

        self.state.transition(PublishState::Confirmed)?;
        self.push(&prepared.metadata, credentials).await
    }

    async fn push(
        &mut self,
        metadata: &Metadata,
        credentials: &Credentials,
    ) -> PublishResult<PublishOutcome> {
        let name = &metadata.name;
        let version = &metadata.version;

        self.state.transition(PublishState::PackageUpserting)?;
        self.console
            .info(&format!("{}...", PublishStage::PackageUpsert.describe()));
        let response = self
            .registry
            .upsert_package(name, metadata, credentials)
            .await?;
        if let Err(rejection) = response.accept(UPLOAD_SUCCESS) {
            return self.fail(PublishStage::PackageUpsert, rejection);
        }

        self.state.transition(PublishState::ArchiveBuilding)?;
        let archive = match self.archiver.build(metadata, &metadata.files) {
            Ok(archive) => archive,
            Err(e) => {
                self.state.transition(PublishState::Failed)?;
                return Err(e);
            }
        };

        self.state.transition(PublishState::ReleaseUploading)?;
        self.console
            .info(&format!("{}...", PublishStage::ReleaseUpload.describe()));
        let response = self
            .registry
            .upload_release(name, version, archive, credentials)
            .await?;
        if let Err(rejection) = response.accept(UPLOAD_SUCCESS) {
            return self.fail(PublishStage::ReleaseUpload, rejection);
        }

        self.state.transition(PublishState::Published)?;
        self.console
            .info(&format!("✅ Published {} v{}", name, version));

        Ok(PublishOutcome::Published {
            version: version.clone(),
        })
    }

    /// Delete a previously published release
    pub async fn revert(
        &mut self,
        name: &str,
        version: &str,
        credentials: &Credentials,
    ) -> PublishResult<PublishOutcome> {
        self.state.transition(PublishState::Reverting)?;
        self.console
            .info(&format!("{} {} v{}...", PublishStage::Revert.describe(), name, version));

        let response = self
            .registry
            .delete_release(name, version, credentials)
            .await?;
        if let Err(rejection) = response.accept(REVERT_SUCCESS) {
            return self.fail(PublishStage::Revert, rejection);
        }

        self.state.transition(PublishState::Reverted)?;
        self.console
            .info(&format!("✅ Reverted {} v{}", name, version));

        Ok(PublishOutcome::Reverted {
            version: version.to_string(),
        })
    }

    fn fail(&mut self, stage: PublishStage, rejection: Rejection) -> PublishResult<PublishOutcome> {
        self.state.transition(PublishState::Failed)?;
        self.console
            .report_error(stage, rejection.status, &rejection.body);

        Ok(PublishOutcome::Failed {
            stage,
            status: rejection.status,
            body: rejection.body,
        })
    }
}
