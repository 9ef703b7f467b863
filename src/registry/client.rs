//! HTTP client for the package registry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use secrecy::ExposeSecret;
use tracing::{debug, info};

use crate::core::config::PublishConfig;
use crate::core::error::{PublishError, PublishResult};
use crate::core::traits::{RegistryApi, RegistryResponse};
use crate::registry::credentials::Credentials;
use crate::release::metadata::Metadata;

/// User agent for registry requests.
pub const REGISTRY_USER_AGENT: &str = concat!("package-release/", env!("CARGO_PKG_VERSION"));

/// Registry client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// HTTP client.
    client: reqwest::Client,

    /// Base URL for the registry, without trailing slash.
    base_url: String,
}

impl RegistryClient {
    /// Create a new registry client.
    pub fn new(base_url: &str, timeout: Duration) -> PublishResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(REGISTRY_USER_AGENT));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| PublishError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the merged configuration.
    pub fn from_config(config: &PublishConfig) -> PublishResult<Self> {
        Self::new(
            &config.registry_url(),
            Duration::from_secs(config.timeout_secs()),
        )
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        credentials: &Credentials,
    ) -> reqwest::RequestBuilder {
        match credentials {
            Credentials::Password { username, password } => {
                request.basic_auth(username, Some(password.expose_secret()))
            }
            Credentials::ApiKey(key) => request.header(AUTHORIZATION, key.expose_secret()),
        }
    }

    /// Send a request and decode whatever the registry answers.
    ///
    /// Every HTTP status is returned to the caller; only transport failures
    /// are errors.
    async fn send(&self, request: reqwest::RequestBuilder) -> PublishResult<RegistryResponse> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        debug!(status, body_len = bytes.len(), "registry response");

        Ok(RegistryResponse::new(status, decode_body(&bytes)))
    }
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn upsert_package(
        &self,
        name: &str,
        metadata: &Metadata,
        credentials: &Credentials,
    ) -> PublishResult<RegistryResponse> {
        let url = format!("{}/packages/{}", self.base_url, name);
        info!(url = %url, auth = %credentials.describe(), "updating package");

        let request = self
            .client
            .put(&url)
            .json(&serde_json::json!({ "meta": metadata }));

        self.send(self.authorize(request, credentials)).await
    }

    async fn upload_release(
        &self,
        name: &str,
        version: &str,
        archive: Vec<u8>,
        credentials: &Credentials,
    ) -> PublishResult<RegistryResponse> {
        let url = format!("{}/packages/{}/releases", self.base_url, name);
        info!(url = %url, version, size = archive.len(), "uploading release");

        let request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(archive);

        self.send(self.authorize(request, credentials)).await
    }

    async fn delete_release(
        &self,
        name: &str,
        version: &str,
        credentials: &Credentials,
    ) -> PublishResult<RegistryResponse> {
        let url = format!("{}/packages/{}/releases/{}", self.base_url, name, version);
        info!(url = %url, "deleting release");

        let request = self.client.delete(&url);

        self.send(self.authorize(request, credentials)).await
    }
}

/// Decode a response body: JSON if possible, raw text otherwise.
fn decode_body(bytes: &[u8]) -> serde_json::Value {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return serde_json::Value::Null;
    }

    serde_json::from_slice(bytes).unwrap_or_else(|_| {
        serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
    })
}
