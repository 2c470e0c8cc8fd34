//! Unified error handling system
//!
//! Provides structured error types with context, recovery suggestions, and proper error chaining.
//! Tool endpoints never let these escape: they are rendered into error envelopes at the
//! tool boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};

pub type ForgeResult<T> = Result<T, ForgeError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            ..Default::default()
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for forgebridge
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Transport-level failure: the request never produced an HTTP status.
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// The forge answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Upstream {
        status: u16,
        message: String,
        context: ErrorContext,
    },

    #[error("Resource not found: {resource}")]
    NotFound {
        resource: String,
        context: ErrorContext,
    },

    #[error("{message}")]
    TypeMismatch {
        message: String,
        expected: String,
        actual: String,
        context: ErrorContext,
    },

    #[error("Decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("User or group '{owner}' not found")]
    Resolution {
        owner: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ForgeError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            ForgeError::Network { context, .. } => Some(context),
            ForgeError::Upstream { context, .. } => Some(context),
            ForgeError::NotFound { context, .. } => Some(context),
            ForgeError::TypeMismatch { context, .. } => Some(context),
            ForgeError::Decode { context, .. } => Some(context),
            ForgeError::Resolution { context, .. } => Some(context),
            ForgeError::Config { context, .. } => Some(context),
            ForgeError::Validation { context, .. } => Some(context),
            ForgeError::Io(_) | ForgeError::Serialization(_) => None,
        }
    }

    /// HTTP status reported by the forge, if the error came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ForgeError::Upstream { status, .. } => Some(*status),
            ForgeError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Check if error is recoverable by the caller (nothing here retries on its own)
    pub fn is_recoverable(&self) -> bool {
        match self {
            ForgeError::Network { .. } => true,
            ForgeError::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        let component = self.context().map(|c| c.component.as_str());
        match self {
            ForgeError::Config { .. } | ForgeError::Validation { .. } => {
                error!(component = ?component, error = %self, "Configuration or validation error");
            }
            ForgeError::Network { .. } => {
                warn!(component = ?component, error = %self, "Network error (may be recoverable)");
            }
            ForgeError::NotFound { .. }
            | ForgeError::Resolution { .. }
            | ForgeError::TypeMismatch { .. }
            | ForgeError::Decode { .. } => {
                warn!(component = ?component, error = %self, "Request could not be satisfied");
            }
            _ if self.is_recoverable() => {
                warn!(component = ?component, status = ?self.status(), error = %self, "Upstream error (may be recoverable)");
            }
            _ => {
                error!(component = ?component, error = %self, "Error occurred");
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        ForgeError::Config {
            message: $msg.to_string(),
            source: None,
            context: ErrorContext::new($component)
                .with_suggestion("Check your configuration file")
                .with_suggestion("Run 'forgebridge config --show' to inspect the effective config"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        ForgeError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}

#[macro_export]
macro_rules! not_found_error {
    ($resource:expr, $component:expr) => {
        ForgeError::NotFound {
            resource: $resource.to_string(),
            context: ErrorContext::new($component)
                .with_suggestion("Verify the resource path or identifier")
                .with_suggestion("Check if the resource exists and is accessible"),
        }
    };
}
