//! Dependency Classifier - decides which dependencies ship with a release
//!
//! A dependency becomes a requirement of the release when the registry's own
//! source handler claims it and it applies to the `prod` environment.
//! Everything else (path and git dependencies, dev/test-only dependencies) is
//! excluded by name and only mentioned in the report.

use crate::core::error::{PublishError, PublishResult};
use crate::project::{DependencyOptions, RawDependency};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Environment token a dependency must apply to in order to be published
pub const PROD_ENV: &str = "prod";

/// Requirement sent for registry dependencies declared without one
pub const ANY_VERSION: &str = ">= 0.0.0";

/// Source mechanism that resolves a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Registry,
    Path,
    Git,
}

/// A source mechanism that may claim a dependency
pub trait SourceHandler: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Whether this handler resolves a dependency declared with `options`
    fn claims(&self, name: &str, options: &DependencyOptions) -> bool;
}

/// Dependencies fetched from a local path
pub struct PathSource;

impl SourceHandler for PathSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Path
    }

    fn claims(&self, _name: &str, options: &DependencyOptions) -> bool {
        options.path.is_some()
    }
}

/// Dependencies fetched from a git repository
pub struct GitSource;

impl SourceHandler for GitSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Git
    }

    fn claims(&self, _name: &str, options: &DependencyOptions) -> bool {
        options.git.is_some()
    }
}

/// Dependencies fetched from the package registry
pub struct RegistrySource;

impl SourceHandler for RegistrySource {
    fn kind(&self) -> SourceKind {
        SourceKind::Registry
    }

    fn claims(&self, _name: &str, options: &DependencyOptions) -> bool {
        options.path.is_none() && options.git.is_none()
    }
}

/// Ordered list of source handlers, first claim wins
pub struct SourceHandlers {
    handlers: Vec<Box<dyn SourceHandler>>,
}

impl Default for SourceHandlers {
    fn default() -> Self {
        Self::new(vec![
            Box::new(PathSource),
            Box::new(GitSource),
            Box::new(RegistrySource),
        ])
    }
}

impl SourceHandlers {
    pub fn new(handlers: Vec<Box<dyn SourceHandler>>) -> Self {
        Self { handlers }
    }

    /// Kind of the first handler claiming the dependency, if any
    pub fn find_handler_claiming(
        &self,
        name: &str,
        options: &DependencyOptions,
    ) -> Option<SourceKind> {
        self.handlers
            .iter()
            .find(|handler| handler.claims(name, options))
            .map(|handler| handler.kind())
    }
}

/// A classified dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub requirement: Option<String>,
    pub optional: bool,
    /// Environments the dependency applies to; `None` means all
    pub environments: Option<BTreeSet<String>>,
    pub is_override: bool,
    pub source: Option<SourceKind>,
}

impl Dependency {
    pub fn is_registry_sourced(&self) -> bool {
        self.source == Some(SourceKind::Registry)
    }

    pub fn is_production(&self) -> bool {
        self.environments
            .as_ref()
            .is_none_or(|envs| envs.contains(PROD_ENV))
    }
}

/// Requirement entry of the release metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub requirement: String,
    pub optional: bool,
}

/// Result of classification: a total partition of the input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub include: Vec<Dependency>,
    pub exclude: Vec<String>,
}

impl Classification {
    /// Fail if any included dependency is an override
    pub fn check_overrides(&self) -> PublishResult<()> {
        match self.include.iter().find(|dep| dep.is_override) {
            Some(dep) => Err(PublishError::OverriddenDependency {
                name: dep.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Included dependencies as the `requirements` map of the metadata
    pub fn requirements(&self) -> BTreeMap<String, Requirement> {
        self.include
            .iter()
            .map(|dep| {
                (
                    dep.name.clone(),
                    Requirement {
                        requirement: dep
                            .requirement
                            .clone()
                            .unwrap_or_else(|| ANY_VERSION.to_string()),
                        optional: dep.optional,
                    },
                )
            })
            .collect()
    }
}

/// Partitions declared dependencies into published and excluded sets
pub struct DependencyClassifier {
    handlers: SourceHandlers,
}

impl Default for DependencyClassifier {
    fn default() -> Self {
        Self::new(SourceHandlers::default())
    }
}

impl DependencyClassifier {
    pub fn new(handlers: SourceHandlers) -> Self {
        Self { handlers }
    }

    /// Classify every dependency exactly once
    ///
    /// # Examples
    ///
    /// ```
    /// use package_release::project::{DependencyOptions, RawDependency};
    /// use package_release::release::DependencyClassifier;
    ///
    /// let deps = vec![
    ///     RawDependency::new("plug", "~> 1.0"),
    ///     RawDependency::with_options(
    ///         "local",
    ///         DependencyOptions { path: Some("../local".into()), ..Default::default() },
    ///     ),
    /// ];
    ///
    /// let classification = DependencyClassifier::default().classify(&deps);
    /// assert_eq!(classification.include[0].name, "plug");
    /// assert_eq!(classification.exclude, vec!["local".to_string()]);
    /// ```
    pub fn classify(&self, deps: &[RawDependency]) -> Classification {
        let mut classification = Classification::default();

        for raw in deps {
            let dep = self.to_dependency(raw);

            if dep.is_registry_sourced() && dep.is_production() {
                classification.include.push(dep);
            } else {
                debug!(
                    dependency = %dep.name,
                    source = ?dep.source,
                    production = dep.is_production(),
                    "excluding dependency from release"
                );
                classification.exclude.push(dep.name);
            }
        }

        classification
    }

    fn to_dependency(&self, raw: &RawDependency) -> Dependency {
        let options = &raw.options;

        Dependency {
            name: raw.name.clone(),
            requirement: options.version.clone(),
            optional: options.optional,
            environments: options
                .only
                .as_ref()
                .map(|envs| envs.iter().cloned().collect()),
            is_override: options.is_override,
            source: self.handlers.find_handler_claiming(&raw.name, options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(name: &str, options: DependencyOptions) -> RawDependency {
        RawDependency::with_options(name, options)
    }

    fn sample() -> Vec<RawDependency> {
        vec![
            RawDependency::new("plug", "~> 1.0"),
            dep(
                "postgrex",
                DependencyOptions {
                    version: Some("~> 0.5".to_string()),
                    optional: true,
                    ..Default::default()
                },
            ),
            dep(
                "local",
                DependencyOptions {
                    path: Some("../local".to_string()),
                    ..Default::default()
                },
            ),
            dep(
                "remote",
                DependencyOptions {
                    git: Some("https://example.com/remote.git".to_string()),
                    ..Default::default()
                },
            ),
            dep(
                "ex_doc",
                DependencyOptions {
                    version: Some("~> 0.6".to_string()),
                    only: Some(vec!["dev".to_string()]),
                    ..Default::default()
                },
            ),
            dep(
                "telemetry",
                DependencyOptions {
                    version: Some("~> 1.0".to_string()),
                    only: Some(vec!["dev".to_string(), "prod".to_string()]),
                    ..Default::default()
                },
            ),
        ]
    }

    #[test]
    fn test_classification_is_a_partition() {
        let deps = sample();
        let classification = DependencyClassifier::default().classify(&deps);

        let mut names: Vec<String> = classification
            .include
            .iter()
            .map(|d| d.name.clone())
            .chain(classification.exclude.iter().cloned())
            .collect();
        names.sort();

        let mut expected: Vec<String> = deps.iter().map(|d| d.name.clone()).collect();
        expected.sort();

        assert_eq!(names, expected);
    }

    #[test]
    fn test_include_and_exclude_sets() {
        let classification = DependencyClassifier::default().classify(&sample());

        let included: Vec<&str> = classification
            .include
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(included, vec!["plug", "postgrex", "telemetry"]);
        assert_eq!(classification.exclude, vec!["local", "remote", "ex_doc"]);
    }

    #[test]
    fn test_requirements_contain_only_included() {
        let classification = DependencyClassifier::default().classify(&sample());
        let requirements = classification.requirements();

        assert_eq!(requirements.len(), 3);
        assert_eq!(
            requirements["postgrex"],
            Requirement {
                requirement: "~> 0.5".to_string(),
                optional: true,
            }
        );
        assert!(!requirements.contains_key("local"));
        assert!(!requirements.contains_key("remote"));
    }

    #[test]
    fn test_missing_requirement_defaults_to_any() {
        let deps = vec![dep("jason", DependencyOptions::default())];
        let requirements = DependencyClassifier::default()
            .classify(&deps)
            .requirements();

        assert_eq!(requirements["jason"].requirement, ANY_VERSION);
    }

    #[test]
    fn test_override_on_included_dependency_is_fatal() {
        let deps = vec![
            RawDependency::new("plug", "~> 1.0"),
            dep(
                "cowboy",
                DependencyOptions {
                    version: Some("1.0.0".to_string()),
                    is_override: true,
                    ..Default::default()
                },
            ),
        ];

        let err = DependencyClassifier::default()
            .classify(&deps)
            .check_overrides()
            .unwrap_err();
        assert!(matches!(err, PublishError::OverriddenDependency { name } if name == "cowboy"));
    }

    #[test]
    fn test_override_on_excluded_dependency_is_allowed() {
        let deps = vec![dep(
            "local",
            DependencyOptions {
                path: Some("../local".to_string()),
                is_override: true,
                ..Default::default()
            },
        )];

        let classification = DependencyClassifier::default().classify(&deps);
        assert!(classification.check_overrides().is_ok());
    }

    #[test]
    fn test_empty_only_list_applies_nowhere() {
        let deps = vec![dep(
            "plug",
            DependencyOptions {
                version: Some("~> 1.0".to_string()),
                only: Some(vec![]),
                ..Default::default()
            },
        )];

        let classification = DependencyClassifier::default().classify(&deps);
        assert_eq!(classification.exclude, vec!["plug"]);
    }

    #[test]
    fn test_handler_priority() {
        let handlers = SourceHandlers::default();
        let both = DependencyOptions {
            path: Some("../a".to_string()),
            git: Some("https://example.com/a.git".to_string()),
            ..Default::default()
        };

        assert_eq!(handlers.find_handler_claiming("a", &both), Some(SourceKind::Path));
        assert_eq!(
            handlers.find_handler_claiming("a", &DependencyOptions::default()),
            Some(SourceKind::Registry)
        );
    }

    #[test]
    fn test_unclaimed_dependency_is_excluded() {
        let classifier = DependencyClassifier::new(SourceHandlers::new(vec![Box::new(PathSource)]));
        let classification = classifier.classify(&[RawDependency::new("plug", "~> 1.0")]);

        assert!(classification.include.is_empty());
        assert_eq!(classification.exclude, vec!["plug"]);
    }
}
