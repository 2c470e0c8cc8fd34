//! Tool catalogs
//!
//! Each forge exposes a fixed set of named tools. A tool takes a JSON object of
//! arguments and answers with JSON text: the normalized payload, or the forge's
//! error envelope when the upstream call failed. Only unknown tool names and
//! malformed arguments are reported as errors.

use async_trait::async_trait;
use forgebridge_core::{not_found_error, ErrorContext, ForgeBridgeConfig, ForgeError, ForgeResult};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

pub mod github;
pub mod gitlab;


pub use github::GitHubTools;
pub use gitlab::GitLabTools;

use crate::api::{ApiClientConfig, GitHubAdapter, GitLabAdapter};

const COMPONENT: &str = "tools";

/// Supported forges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forge {
    GitHub,
    GitLab,
}

impl fmt::Display for Forge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Forge::GitHub => write!(f, "github"),
            Forge::GitLab => write!(f, "gitlab"),
        }
    }
}

impl FromStr for Forge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(Forge::GitHub),
            "gitlab" => Ok(Forge::GitLab),
            other => Err(format!("Unsupported forge '{}' (expected github or gitlab)", other)),
        }
    }
}

/// Catalog entry advertised to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolSpec {
    pub fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// A forge's tool catalog
#[async_trait]
pub trait ToolProvider: Send + Sync {
    fn forge(&self) -> Forge;

    fn tools(&self) -> Vec<ToolSpec>;

    /// Run one tool. Upstream failures come back as `Ok` error envelopes.
    async fn call(&self, name: &str, arguments: Value) -> ForgeResult<String>;

    fn has_tool(&self, name: &str) -> bool {
        self.tools().iter().any(|tool| tool.name == name)
    }
}

/// Build the catalog for `forge` from the effective configuration
pub fn provider(forge: Forge, config: &ForgeBridgeConfig) -> ForgeResult<Box<dyn ToolProvider>> {
    Ok(match forge {
        Forge::GitHub => Box::new(GitHubTools::new(GitHubAdapter::new(
            ApiClientConfig::github_from(config),
        )?)),
        Forge::GitLab => Box::new(GitLabTools::new(GitLabAdapter::new(
            ApiClientConfig::gitlab_from(config),
        )?)),
    })
}

pub(crate) fn unknown_tool(forge: Forge, name: &str) -> ForgeError {
    not_found_error!(format!("{} tool '{}'", forge, name), COMPONENT)
}

/// Decode a tool's argument object. A missing object counts as empty.
pub(crate) fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: Value) -> ForgeResult<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };

    serde_json::from_value(arguments).map_err(|e| ForgeError::Validation {
        message: format!("Invalid arguments for {}: {}", tool, e),
        field: None,
        context: ErrorContext::new(COMPONENT)
            .with_operation(tool)
            .with_suggestion("Check the tool's inputSchema"),
    })
}

// ---------------------------------------------------------------------------
// Schema helpers
// ---------------------------------------------------------------------------

pub(crate) fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

pub(crate) fn string_property(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

pub(crate) fn string_default(description: &str, default: &str) -> Value {
    json!({ "type": "string", "description": description, "default": default })
}

pub(crate) fn per_page_property(noun: &str) -> Value {
    json!({
        "type": "integer",
        "description": format!("Number of {} per page (default: 30, max: 100)", noun),
        "default": 30,
        "minimum": 1,
        "maximum": 100,
    })
}

pub(crate) fn integer_property(description: &str) -> Value {
    json!({ "type": "integer", "description": description, "minimum": 1 })
}

pub(crate) fn string_list_property(description: &str) -> Value {
    json!({ "type": "array", "items": { "type": "string" }, "description": description })
}

// ---------------------------------------------------------------------------
// Lenient argument decoding
// ---------------------------------------------------------------------------

/// Clients send identifiers either as JSON numbers or as strings
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Text(String),
}

/// Accept `42` or `"42"`
pub(crate) fn number_from_any<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected a positive integer, got '{}'", s))),
    }
}

/// Accept `"group/project"`, `"123"` or `123`
pub(crate) fn text_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => n.to_string(),
        NumberOrText::Text(s) => s,
    })
}

pub(crate) fn default_branch_argument() -> String {
    "main".to_string()
}
