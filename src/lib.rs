pub mod core;
pub mod orchestration;
pub mod project;
pub mod registry;
pub mod release;

pub use crate::core::{PublishError, PublishResult};
pub use orchestration::{PreparedRelease, PublishOutcome, ReleasePublisher, TerminalConsole};
pub use project::Project;
pub use registry::{Credentials, RegistryClient, TarballBuilder};
pub use release::Metadata;
