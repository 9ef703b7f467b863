//! Registry credentials with memory-safe handling and masking
//!
//! Secrets are held in `secrecy::SecretString` so they never show up in
//! `Debug` output or logs; [`mask_token`] renders them for display.

use crate::core::config::AuthConfig;
use crate::core::error::{PublishError, PublishResult};
use secrecy::{ExposeSecret, SecretString};

/// Credentials attached to every authenticated registry call
#[derive(Debug)]
pub enum Credentials {
    /// Username and password, sent as HTTP basic auth
    Password {
        username: String,
        password: SecretString,
    },
    /// A previously issued API key, sent verbatim in `Authorization`
    ApiKey(SecretString),
}

impl Credentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        let key: String = key.into();
        Self::ApiKey(SecretString::new(key.into_boxed_str()))
    }

    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        let password: String = password.into();
        Self::Password {
            username: username.into(),
            password: SecretString::new(password.into_boxed_str()),
        }
    }

    /// Resolve credentials from configuration
    ///
    /// An API key wins over a username/password pair. A username without a
    /// password (or the reverse) does not count as credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use package_release::core::config::AuthConfig;
    /// use package_release::registry::Credentials;
    ///
    /// let auth = AuthConfig {
    ///     username: Some("alice".into()),
    ///     password: Some("hunter2".into()),
    ///     api_key: None,
    /// };
    /// let credentials = Credentials::from_config(Some(&auth)).unwrap();
    /// assert_eq!(credentials.describe(), "user alice");
    /// ```
    pub fn from_config(auth: Option<&AuthConfig>) -> PublishResult<Self> {
        let auth = auth.ok_or(PublishError::CredentialsMissing)?;

        if let Some(key) = auth.api_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(Self::api_key(key));
        }

        match (auth.username.as_deref(), auth.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() => {
                Ok(Self::password(username, password))
            }
            _ => Err(PublishError::CredentialsMissing),
        }
    }

    /// Safe description for logs and reports
    pub fn describe(&self) -> String {
        match self {
            Self::Password { username, .. } => format!("user {}", username),
            Self::ApiKey(key) => format!("api key {}", mask_token(key.expose_secret())),
        }
    }
}

/// Mask a token for safe logging
///
/// Shows only the first 3 and last 3 characters. Tokens shorter than 10
/// characters are fully masked.
///
/// # Examples
///
/// ```
/// use package_release::registry::credentials::mask_token;
///
/// assert_eq!(mask_token("abcdef123456"), "abc...456");
/// assert_eq!(mask_token("short"), "****");
/// ```
pub fn mask_token(token: &str) -> String {
    if token.chars().count() < 10 {
        return "****".to_string();
    }

    let prefix: String = token.chars().take(3).collect();
    let suffix: String = token
        .chars()
        .rev()
        .take(3)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{}...{}", prefix, suffix)
}
