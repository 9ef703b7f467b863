//! Release assembly: everything computed locally before talking to the registry

pub mod dependencies;
pub mod files;
pub mod metadata;
pub mod report;

pub use dependencies::{
    Classification, Dependency, DependencyClassifier, Requirement, SourceHandler, SourceHandlers,
    SourceKind,
};
pub use files::{DEFAULT_FILE_PATTERNS, FileSetResolver};
pub use metadata::{Metadata, PackageFields, assemble};
pub use report::{render, render_error};
