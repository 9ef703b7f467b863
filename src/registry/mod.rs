//! Registry access: HTTP client, credentials and the release tarball

pub mod archive;
pub mod client;
pub mod credentials;

pub use archive::{TarballBuilder, TARBALL_VERSION};
pub use client::{RegistryClient, REGISTRY_USER_AGENT};
pub use credentials::{mask_token, Credentials};
