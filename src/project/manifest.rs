//! Project manifest - reads `project.toml`
//!
//! The manifest has three tables:
//! - `[project]` - name, version and description (name and version required)
//! - `[package]` - package-specific metadata, kept as a raw table and
//!   whitelisted by the metadata assembler
//! - `[dependencies]` - declared dependencies, either a bare requirement
//!   string or a table of options
//!
//! # Example
//!
//! ```no_run
//! use package_release::project::Project;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), package_release::PublishError> {
//! let project = Project::load(Path::new(".")).await?;
//! println!("{} v{}", project.config.name, project.config.version);
//! # Ok(())
//! # }
//! ```

use crate::core::error::{PublishError, PublishResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Manifest file name, relative to the project root
pub const MANIFEST_FILE: &str = "project.toml";

/// Project-level fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Options a dependency is declared with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyOptions {
    /// Version requirement, e.g. `~> 1.0`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub optional: bool,

    /// Environments the dependency applies to; absent means all
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub only: Option<Vec<String>>,

    #[serde(default, rename = "override")]
    pub is_override: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
}

/// Dependency as declared in the manifest, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDependency {
    pub name: String,
    pub options: DependencyOptions,
}

impl RawDependency {
    /// Declare a registry dependency with a requirement
    pub fn new(name: impl Into<String>, requirement: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: DependencyOptions {
                version: Some(requirement.into()),
                ..Default::default()
            },
        }
    }

    pub fn with_options(name: impl Into<String>, options: DependencyOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

/// A loaded project: root directory plus parsed manifest
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
    /// Raw `[package]` table, if present
    pub package: Option<toml::Table>,
    pub dependencies: Vec<RawDependency>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependencySpec {
    Requirement(String),
    Detailed(DependencyOptions),
}

#[derive(Debug, Deserialize)]
struct RawProjectTable {
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    project: Option<RawProjectTable>,
    package: Option<toml::Table>,
    #[serde(default)]
    dependencies: BTreeMap<String, DependencySpec>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(
        Option::<OneOrMany>::deserialize(deserializer)?.map(|value| match value {
            OneOrMany::One(env) => vec![env],
            OneOrMany::Many(envs) => envs,
        }),
    )
}

impl Project {
    /// Load `project.toml` from the project root
    pub async fn load(root: &Path) -> PublishResult<Self> {
        let manifest_path = root.join(MANIFEST_FILE);

        if fs::metadata(&manifest_path).await.is_err() {
            return Err(PublishError::ManifestNotFound {
                path: manifest_path,
            });
        }

        let content = fs::read_to_string(&manifest_path)
            .await
            .map_err(|e| PublishError::io(&manifest_path, e))?;

        Self::parse(root, &content)
    }

    /// Parse manifest content for a project rooted at `root`
    pub fn parse(root: &Path, content: &str) -> PublishResult<Self> {
        let manifest: RawManifest = toml::from_str(content)
            .map_err(|e| PublishError::Config(format!("invalid {}: {}", MANIFEST_FILE, e)))?;

        let project = manifest.project.ok_or_else(|| PublishError::MissingField {
            field: "project".to_string(),
        })?;

        let name = required(project.name, "name")?;
        let version = required(project.version, "version")?;

        if let Err(e) = semver::Version::parse(&version) {
            return Err(PublishError::InvalidVersion {
                version,
                message: e.to_string(),
            });
        }

        let dependencies = manifest
            .dependencies
            .into_iter()
            .map(|(name, spec)| match spec {
                DependencySpec::Requirement(requirement) => RawDependency::new(name, requirement),
                DependencySpec::Detailed(options) => RawDependency::with_options(name, options),
            })
            .collect();

        Ok(Self {
            root: root.to_path_buf(),
            config: ProjectConfig {
                name,
                version,
                description: project.description,
            },
            package: manifest.package,
            dependencies,
        })
    }
}

fn required(value: Option<String>, field: &str) -> PublishResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(PublishError::MissingField {
            field: field.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
[project]
name = "ecto"
version = "0.2.0"
description = "Database wrapper"

[package]
license = "Apache-2.0"

[dependencies]
plug = "~> 1.0"
postgrex = { version = "~> 0.5", optional = true }
local = { path = "../local" }
dev_tool = { version = "~> 0.1", only = "dev" }
"#;

    #[test]
    fn test_parse_manifest() {
        let project = Project::parse(Path::new("/tmp/ecto"), MANIFEST).unwrap();

        assert_eq!(project.config.name, "ecto");
        assert_eq!(project.config.version, "0.2.0");
        assert_eq!(
            project.config.description,
            Some("Database wrapper".to_string())
        );
        assert!(project.package.unwrap().contains_key("license"));
        assert_eq!(project.dependencies.len(), 4);
    }

    #[test]
    fn test_parse_dependency_forms() {
        let project = Project::parse(Path::new("."), MANIFEST).unwrap();
        let find = |name: &str| {
            project
                .dependencies
                .iter()
                .find(|d| d.name == name)
                .unwrap()
                .clone()
        };

        assert_eq!(find("plug").options.version, Some("~> 1.0".to_string()));
        assert!(find("postgrex").options.optional);
        assert_eq!(find("local").options.path, Some("../local".to_string()));
        assert_eq!(find("dev_tool").options.only, Some(vec!["dev".to_string()]));
    }

    #[test]
    fn test_missing_version() {
        let err = Project::parse(Path::new("."), "[project]\nname = \"ecto\"\n").unwrap_err();
        assert!(matches!(err, PublishError::MissingField { field } if field == "version"));
    }

    #[test]
    fn test_missing_name() {
        let err =
            Project::parse(Path::new("."), "[project]\nname = \"\"\nversion = \"1.0.0\"\n")
                .unwrap_err();
        assert!(matches!(err, PublishError::MissingField { field } if field == "name"));
    }

    #[test]
    fn test_invalid_version() {
        let err = Project::parse(
            Path::new("."),
            "[project]\nname = \"ecto\"\nversion = \"one\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, PublishError::InvalidVersion { .. }));
    }

    #[test]
    fn test_unknown_dependency_option_is_rejected() {
        let content = "[project]\nname = \"a\"\nversion = \"1.0.0\"\n[dependencies]\nb = { vrsion = \"1\" }\n";
        let err = Project::parse(Path::new("."), content).unwrap_err();
        assert!(matches!(err, PublishError::Config(_)));
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(MANIFEST_FILE), MANIFEST).unwrap();

        let project = Project::load(temp_dir.path()).await.unwrap();
        assert_eq!(project.root, temp_dir.path());
        assert_eq!(project.config.name, "ecto");
    }

    #[tokio::test]
    async fn test_load_missing_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let err = Project::load(temp_dir.path()).await.unwrap_err();
        assert!(matches!(err, PublishError::ManifestNotFound { .. }));
    }
}
