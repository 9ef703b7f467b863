//! File Set Resolver - expands file patterns into the list of files to ship
//!
//! Each pattern is interpreted relative to the project root. A pattern that
//! names a directory is expanded recursively; anything else is matched as a
//! glob. Only regular files survive, and every file appears once.

use crate::core::error::{PublishError, PublishResult};
use glob::{MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Files shipped when the package configuration does not list any
pub const DEFAULT_FILE_PATTERNS: &[&str] = &[
    "lib",
    "src",
    "priv",
    "project.toml",
    "README*",
    "LICENSE*",
    "CHANGELOG*",
];

/// Resolves file patterns against a project root
#[derive(Debug, Clone)]
pub struct FileSetResolver {
    root: PathBuf,
    case_sensitive: bool,
}

impl FileSetResolver {
    /// Create a resolver for the project rooted at `root`
    ///
    /// Relative roots are taken against the current directory.
    pub fn new(root: &Path) -> PublishResult<Self> {
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| PublishError::io(root, e))?
                .join(root)
        };

        Ok(Self {
            root: normalize(&root),
            case_sensitive: true,
        })
    }

    /// Match glob patterns without regard to case
    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    /// Resolver preconfigured for [`DEFAULT_FILE_PATTERNS`]
    pub fn for_defaults(root: &Path) -> PublishResult<Self> {
        Ok(Self::new(root)?.case_insensitive())
    }

    /// Expand patterns into sorted, deduplicated, root-relative file paths
    ///
    /// Paths use `/` as separator. Patterns that match nothing contribute
    /// nothing; matches outside the project root are skipped. Only a pattern
    /// naming a directory literally is walked: a glob that happens to match a
    /// directory (`li*`, `priv/*`) keeps the files it matches directly and
    /// ignores the directory's contents.
    pub fn resolve<S: AsRef<str>>(&self, patterns: &[S]) -> PublishResult<Vec<String>> {
        let mut files: BTreeSet<PathBuf> = BTreeSet::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let candidate = normalize(&self.root.join(pattern));

            if candidate.is_dir() {
                files.extend(
                    WalkDir::new(&candidate)
                        .into_iter()
                        .filter_map(|e| e.ok())
                        .map(|e| e.into_path())
                        .filter(|path| is_regular_file(path)),
                );
            } else {
                files.extend(self.glob(pattern)?);
            }
        }

        let relative: Vec<String> = files
            .into_iter()
            .filter_map(|path| self.relativize(&path))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        debug!(count = relative.len(), "resolved file set");

        Ok(relative)
    }

    fn glob(&self, pattern: &str) -> PublishResult<Vec<PathBuf>> {
        let full_pattern = format!(
            "{}/{}",
            Pattern::escape(&self.root.to_string_lossy()),
            pattern
        );
        let options = MatchOptions {
            case_sensitive: self.case_sensitive,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        let paths = glob::glob_with(&full_pattern, options).map_err(|e| {
            PublishError::Config(format!("invalid file pattern `{}`: {}", pattern, e))
        })?;

        Ok(paths
            .filter_map(|entry| match entry {
                Ok(path) => Some(normalize(&path)),
                Err(e) => {
                    warn!(pattern, error = %e, "skipping unreadable path");
                    None
                }
            })
            .filter(|path| is_regular_file(path))
            .collect())
    }

    fn relativize(&self, path: &Path) -> Option<String> {
        match path.strip_prefix(&self.root) {
            Ok(relative) => Some(
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/"),
            ),
            Err(_) => {
                warn!(path = %path.display(), "skipping file outside the project root");
                None
            }
        }
    }
}

/// Regular file check that follows symlinks
fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Lexically remove `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}
