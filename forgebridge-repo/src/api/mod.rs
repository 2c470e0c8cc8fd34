//! Forge adapters
//!
//! One adapter per forge. Each turns tool arguments into REST calls through an
//! [`HttpClient`](crate::http::HttpClient) and projects the responses into the
//! forge's own normalized JSON envelopes.

use forgebridge_core::{ForgeBridgeConfig, DEFAULT_GITHUB_API_BASE, DEFAULT_GITLAB_API_BASE};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use tracing::warn;

pub mod common;
pub mod github;
pub mod gitlab;

#[cfg(test)]
mod tests;

pub use github::GitHubAdapter;
pub use gitlab::GitLabAdapter;

/// Configuration for one forge adapter
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Access token for authentication
    pub access_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Additional headers
    pub headers: HashMap<String, String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            access_token: None,
            timeout_seconds: 30,
            headers: HashMap::new(),
        }
    }
}

impl ApiClientConfig {
    /// Create a new configuration for GitHub
    pub fn github(access_token: Option<String>) -> Self {
        Self {
            base_url: DEFAULT_GITHUB_API_BASE.to_string(),
            access_token,
            ..Default::default()
        }
    }

    /// Create a new configuration for GitLab
    pub fn gitlab(base_url: Option<String>, access_token: Option<String>) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_GITLAB_API_BASE.to_string()),
            access_token,
            ..Default::default()
        }
    }

    pub fn github_from(config: &ForgeBridgeConfig) -> Self {
        Self {
            base_url: config.github_api_base().to_string(),
            access_token: config.github.token.clone(),
            timeout_seconds: config.http.timeout_seconds,
            ..Default::default()
        }
    }

    pub fn gitlab_from(config: &ForgeBridgeConfig) -> Self {
        Self {
            base_url: config.gitlab_api_base().to_string(),
            access_token: config.gitlab.token.clone(),
            timeout_seconds: config.http.timeout_seconds,
            ..Default::default()
        }
    }

    /// Set additional header
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Join the base URL and an endpoint path
    pub(crate) fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

/// Build a header map from fixed forge headers plus any configured extras.
/// Values that are not valid header text are skipped with a warning.
pub(crate) fn build_headers(fixed: &[(HeaderName, String)], config: &ApiClientConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for (name, value) in fixed {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.insert(name.clone(), value);
            }
            Err(_) => warn!("Dropping {} header: value is not valid header text", name),
        }
    }

    for (key, value) in &config.headers {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!("Dropping configured header '{}': not valid header text", key),
        }
    }

    headers
}
