//! Configuration management
//!
//! Configuration is read once at startup (TOML file, then environment overlay) and is
//! immutable afterwards.

use crate::error::{ErrorContext, ForgeError, ForgeResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_GITLAB_API_BASE: &str = "https://gitlab.com/api/v4";

pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const GITLAB_TOKEN_ENV: &str = "GITLAB_TOKEN";
pub const GITLAB_API_BASE_ENV: &str = "GITLAB_API_BASE";

/// Static credential and endpoint for one forge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeCredentials {
    /// Access token sent with every request
    pub token: Option<String>,
    /// API base override (defaults to the public instance)
    pub api_base: Option<String>,
}

/// HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

/// Process-wide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeBridgeConfig {
    pub github: ForgeCredentials,
    pub gitlab: ForgeCredentials,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

impl ForgeBridgeConfig {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ForgeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ForgeError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> ForgeResult<Self> {
        toml::from_str(content).map_err(|e| ForgeError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })
    }

    /// Load the effective configuration: explicit file, else the first default location that
    /// exists, else defaults; then the process environment on top.
    pub fn load(path: Option<&Path>) -> ForgeResult<Self> {
        let mut config = match path {
            Some(path) => {
                tracing::info!("Loading configuration from {:?}", path);
                Self::from_file(path)?
            }
            None => match Self::default_paths().into_iter().find(|p| p.exists()) {
                Some(path) => {
                    tracing::info!("Loading configuration from {:?}", path);
                    Self::from_file(&path)?
                }
                None => {
                    tracing::debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Candidate config file locations, in lookup order
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|d| d.join("forgebridge").join("config.toml")),
            dirs::home_dir().map(|d| d.join(".forgebridge").join("config.toml")),
            Some(PathBuf::from("forgebridge.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Overlay environment values. Values are trimmed; empty ones are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(token) = lookup(GITHUB_TOKEN_ENV) {
            self.github.token = Some(token);
        }
        if let Some(token) = lookup(GITLAB_TOKEN_ENV) {
            self.gitlab.token = Some(token);
        }
        if let Some(base) = lookup(GITLAB_API_BASE_ENV) {
            self.gitlab.api_base = Some(base);
        }
    }

    pub fn github_api_base(&self) -> &str {
        self.github
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_GITHUB_API_BASE)
    }

    pub fn gitlab_api_base(&self) -> &str {
        self.gitlab
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_GITLAB_API_BASE)
    }

    /// Validate configuration
    pub fn validate(&self) -> ForgeResult<()> {
        if self.http.timeout_seconds == 0 {
            return Err(ForgeError::Config {
                message: "HTTP timeout_seconds must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set http.timeout_seconds to a positive value"),
            });
        }

        for (forge, base) in [
            ("github", self.github_api_base()),
            ("gitlab", self.gitlab_api_base()),
        ] {
            let parsed = url::Url::parse(base).map_err(|e| ForgeError::Config {
                message: format!("Invalid {} api_base '{}': {}", forge, base, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_metadata("forge", forge),
            })?;

            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ForgeError::Config {
                    message: format!(
                        "Invalid {} api_base '{}': scheme must be http or https",
                        forge, base
                    ),
                    source: None,
                    context: ErrorContext::new("config")
                        .with_operation("validate")
                        .with_metadata("forge", forge),
                });
            }
        }

        Ok(())
    }

    /// Copy of the configuration safe to print: tokens are masked
    pub fn redacted(&self) -> Self {
        let mask = |token: &Option<String>| token.as_ref().map(|_| "********".to_string());
        let mut copy = self.clone();
        copy.github.token = mask(&self.github.token);
        copy.gitlab.token = mask(&self.gitlab.token);
        copy
    }
}
