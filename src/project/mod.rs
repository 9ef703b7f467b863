pub mod manifest;

pub use manifest::{DependencyOptions, Project, ProjectConfig, RawDependency, MANIFEST_FILE};
