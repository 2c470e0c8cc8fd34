//! forgebridge repo - forge adapters and tool catalogs
//!
//! Talks to the GitHub and GitLab REST APIs and reduces their responses to the
//! compact JSON envelopes served as tools.

pub mod api;
pub mod http;
pub mod tools;

pub use api::{ApiClientConfig, GitHubAdapter, GitLabAdapter};
pub use http::{HttpClient, HttpResponse, ReqwestHttpClient};
pub use tools::{provider, Forge, GitHubTools, GitLabTools, ToolProvider, ToolSpec};
