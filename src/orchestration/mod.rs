//! Orchestration layer for release publishing
//!
//! This module drives a publish or revert run from a loaded project to a
//! [`PublishOutcome`], talking to the operator through a [`Console`](crate::core::Console).

pub mod console;
pub mod release_publisher;

// Re-export main types for convenience
pub use console::TerminalConsole;
pub use release_publisher::{
    PreparedRelease, PublishOutcome, ReleasePublisher, REVERT_SUCCESS, UPLOAD_SUCCESS,
};
