//! Metadata Assembler - builds the canonical release manifest
//!
//! Sources, highest precedence first:
//! 1. computed requirements (from the dependency classifier)
//! 2. the `[package]` table, restricted to a whitelist of keys
//! 3. the `[project]` table
//! 4. built-in defaults (the default file patterns)
//!
//! Unknown `[package]` keys are dropped and never reach the registry.

use crate::core::error::{PublishError, PublishResult};
use crate::project::ProjectConfig;
use crate::release::dependencies::Requirement;
use crate::release::files::{DEFAULT_FILE_PATTERNS, FileSetResolver};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Recommended fields, warned about when absent
pub const RECOMMENDED_FIELDS: &[&str] = &["description", "licenses", "contributors", "links"];

/// Keys accepted from the `[package]` table
const PACKAGE_FIELDS: &[&str] = &[
    "description",
    "licenses",
    "license",
    "contributors",
    "links",
    "files",
];

/// Canonical release manifest sent to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub licenses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub requirements: BTreeMap<String, Requirement>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl Metadata {
    /// Recommended fields that are absent, in [`RECOMMENDED_FIELDS`] order
    pub fn missing_recommended_fields(&self) -> Vec<&'static str> {
        RECOMMENDED_FIELDS
            .iter()
            .copied()
            .filter(|field| match *field {
                "description" => self.description.is_none(),
                "licenses" => self.licenses.is_none(),
                "contributors" => self.contributors.is_none(),
                "links" => self.links.is_none(),
                _ => false,
            })
            .collect()
    }
}

/// Whitelisted, normalized `[package]` fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageFields {
    pub description: Option<String>,
    pub licenses: Option<Vec<String>>,
    pub contributors: Option<Vec<String>>,
    pub links: Option<BTreeMap<String, String>>,
    pub files: Option<Vec<String>>,
}

impl PackageFields {
    /// Extract the recognized keys from a raw `[package]` table
    ///
    /// The legacy `license` key is accepted as an alias of `licenses`;
    /// `licenses` wins when both are present.
    pub fn from_table(table: &toml::Table) -> PublishResult<Self> {
        for key in table.keys() {
            if !PACKAGE_FIELDS.contains(&key.as_str()) {
                debug!(key = %key, "dropping unknown package field");
            }
        }

        let licenses = match table.get("licenses") {
            Some(value) => Some(string_list("licenses", value)?),
            None => table
                .get("license")
                .map(|value| string_list("license", value))
                .transpose()?,
        };

        Ok(Self {
            description: table
                .get("description")
                .map(|value| string("description", value))
                .transpose()?,
            licenses,
            contributors: table
                .get("contributors")
                .map(|value| string_list("contributors", value))
                .transpose()?,
            links: table.get("links").map(links).transpose()?,
            files: table
                .get("files")
                .map(|value| string_list("files", value))
                .transpose()?,
        })
    }
}

/// Merge the metadata sources into one record
///
/// `root` is the project root the file patterns are resolved against.
pub fn assemble(
    project: &ProjectConfig,
    package: Option<&toml::Table>,
    requirements: BTreeMap<String, Requirement>,
    root: &Path,
) -> PublishResult<Metadata> {
    let package = package
        .map(PackageFields::from_table)
        .transpose()?
        .unwrap_or_default();

    let files = match &package.files {
        Some(patterns) => FileSetResolver::new(root)?.resolve(patterns)?,
        None => FileSetResolver::for_defaults(root)?.resolve(DEFAULT_FILE_PATTERNS)?,
    };

    Ok(Metadata {
        name: project.name.clone(),
        version: project.version.clone(),
        description: package.description.or_else(|| project.description.clone()),
        licenses: package.licenses,
        contributors: package.contributors,
        links: package.links,
        requirements,
        files,
    })
}

fn string(field: &str, value: &toml::Value) -> PublishResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| type_error(field, "a string"))
}

/// A list of strings, or a single string normalized to a one-element list
fn string_list(field: &str, value: &toml::Value) -> PublishResult<Vec<String>> {
    match value {
        toml::Value::String(s) => Ok(vec![s.clone()]),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| string(field, item))
            .collect(),
        _ => Err(type_error(field, "a string or a list of strings")),
    }
}

fn links(value: &toml::Value) -> PublishResult<BTreeMap<String, String>> {
    let table = value
        .as_table()
        .ok_or_else(|| type_error("links", "a table"))?;

    Ok(table
        .iter()
        .map(|(key, value)| {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect())
}

fn type_error(field: &str, expected: &str) -> PublishError {
    PublishError::Config(format!("package.{} must be {}", field, expected))
}
