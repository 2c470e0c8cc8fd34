//! GitHub adapter
//!
//! Normalizes the GitHub REST v3 responses into the GitHub tool envelopes.

use forgebridge_core::{ErrorContext, ForgeError, ForgeResult};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::common::{
    clamp_per_page, decode_base64_text, display_path, encode_path, encode_segment,
    fallback_applies, fallback_from_metadata, listing_error, plain_error, render, sort_entries,
    truncate_content, truncate_optional_description, DirectoryItem,
};
use super::{build_headers, ApiClientConfig};
use crate::http::{HttpClient, ReqwestHttpClient};

const COMPONENT: &str = "github_adapter";
const LISTING_HINT: &str =
    "Check the file path and branch name. Use list_repository_contents to see available files.";

// ---------------------------------------------------------------------------
// Upstream shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GitHubRepository {
    name: String,
    full_name: String,
    description: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    language: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    default_branch: Option<String>,
    topics: Option<Vec<String>>,
    license: Option<GitHubLicense>,
    clone_url: Option<String>,
    ssh_url: Option<String>,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubLicense {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubSearchResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    items: Vec<GitHubRepository>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GitHubLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GitHubIssue {
    number: u64,
    title: String,
    state: String,
    user: Option<GitHubUser>,
    created_at: Option<String>,
    updated_at: Option<String>,
    labels: Option<Vec<GitHubLabel>>,
    assignees: Option<Vec<GitHubUser>>,
    #[serde(default)]
    comments: u64,
    body: Option<String>,
    html_url: Option<String>,
}

/// Single node of the contents endpoint
#[derive(Debug, Deserialize)]
struct GitHubContent {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: u64,
    encoding: Option<String>,
    content: Option<String>,
    sha: Option<String>,
    download_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalized shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct RepositorySummary {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub private: bool,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RepositoryDetail {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub private: bool,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub default_branch: Option<String>,
    pub topics: Vec<String>,
    pub license: String,
    pub clone_url: Option<String>,
    pub ssh_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RepositorySearchItem {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
    pub updated_at: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RepositorySearchResults {
    pub total_count: u64,
    pub repositories: Vec<RepositorySearchItem>,
}

#[derive(Debug, Serialize)]
pub struct IssueSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub user: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub comments: u64,
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IssueDetail {
    #[serde(flatten)]
    pub summary: IssueSummary,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedIssue {
    pub number: u64,
    pub title: String,
    pub url: Option<String>,
    pub state: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContentsEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: Option<u64>,
    pub path: String,
}

impl DirectoryItem for ContentsEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn is_directory(&self) -> bool {
        self.kind == "dir"
    }
}

/// Where a file or directory request pointed
#[derive(Debug, Serialize)]
struct FileLocation {
    repository: String,
    file_path: String,
    branch: String,
}

#[derive(Debug, Serialize)]
pub struct FileInfo {
    pub size: u64,
    pub encoding: String,
}

#[derive(Debug, Serialize)]
struct FileContent {
    #[serde(flatten)]
    location: FileLocation,
    size: u64,
    encoding: String,
    content: String,
    download_url: Option<String>,
    last_modified: Option<String>,
}

#[derive(Debug, Serialize)]
struct FileProblem {
    #[serde(flatten)]
    location: FileLocation,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_info: Option<FileInfo>,
}

#[derive(Debug, Serialize)]
struct DirectoryLocation {
    repository: String,
    path: String,
    branch: String,
}

#[derive(Debug, Serialize)]
struct DirectoryListing {
    #[serde(flatten)]
    location: DirectoryLocation,
    total_items: usize,
    contents: Vec<ContentsEntry>,
}

#[derive(Debug, Serialize)]
struct SingleFileInfo {
    name: String,
    size: u64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
struct SingleFileListing {
    #[serde(flatten)]
    location: DirectoryLocation,
    #[serde(rename = "type")]
    kind: &'static str,
    file_info: SingleFileInfo,
}

#[derive(Debug, Serialize)]
struct DirectoryProblem {
    #[serde(flatten)]
    location: DirectoryLocation,
    error: String,
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

impl From<GitHubRepository> for RepositorySummary {
    fn from(repo: GitHubRepository) -> Self {
        Self {
            name: repo.name,
            full_name: repo.full_name,
            description: repo.description,
            private: repo.private,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            language: repo.language,
            updated_at: repo.updated_at,
        }
    }
}

impl From<GitHubRepository> for RepositoryDetail {
    fn from(repo: GitHubRepository) -> Self {
        Self {
            name: repo.name,
            full_name: repo.full_name,
            description: repo.description,
            private: repo.private,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            language: repo.language,
            created_at: repo.created_at,
            updated_at: repo.updated_at,
            default_branch: repo.default_branch,
            topics: repo.topics.unwrap_or_default(),
            license: repo.license.and_then(|l| l.name).unwrap_or_default(),
            clone_url: repo.clone_url,
            ssh_url: repo.ssh_url,
        }
    }
}

impl From<GitHubRepository> for RepositorySearchItem {
    fn from(repo: GitHubRepository) -> Self {
        Self {
            name: repo.name,
            full_name: repo.full_name,
            description: repo.description,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            language: repo.language,
            updated_at: repo.updated_at,
            url: repo.html_url,
        }
    }
}

impl IssueSummary {
    fn project(issue: GitHubIssue, truncate_body: bool) -> (Self, Option<String>) {
        let body = if truncate_body {
            truncate_optional_description(issue.body)
        } else {
            issue.body
        };

        let summary = Self {
            number: issue.number,
            title: issue.title,
            state: issue.state,
            user: issue.user.map(|u| u.login),
            created_at: issue.created_at,
            updated_at: issue.updated_at,
            labels: issue
                .labels
                .unwrap_or_default()
                .into_iter()
                .map(|l| l.name)
                .collect(),
            assignees: issue
                .assignees
                .unwrap_or_default()
                .into_iter()
                .map(|a| a.login)
                .collect(),
            comments: issue.comments,
            body,
        };

        (summary, issue.html_url)
    }
}

impl From<GitHubIssue> for IssueSummary {
    fn from(issue: GitHubIssue) -> Self {
        Self::project(issue, true).0
    }
}

impl From<GitHubIssue> for IssueDetail {
    fn from(issue: GitHubIssue) -> Self {
        let (summary, url) = IssueSummary::project(issue, false);
        Self { summary, url }
    }
}

impl From<GitHubIssue> for CreatedIssue {
    fn from(issue: GitHubIssue) -> Self {
        Self {
            number: issue.number,
            title: issue.title,
            url: issue.html_url,
            state: issue.state,
            created_at: issue.created_at,
        }
    }
}

/// GitHub tags pull requests inside the issues endpoint with a `pull_request` key
fn is_pull_request(item: &Value) -> bool {
    item.get("pull_request").is_some()
}

/// Arguments of `create_issue`
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
}

impl NewIssue {
    fn payload(&self) -> Value {
        let mut payload = json!({
            "title": self.title,
            "body": self.body,
        });
        if !self.labels.is_empty() {
            payload["labels"] = json!(self.labels);
        }
        if !self.assignees.is_empty() {
            payload["assignees"] = json!(self.assignees);
        }
        payload
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// GitHub API adapter
pub struct GitHubAdapter {
    client: Arc<dyn HttpClient>,
    config: ApiClientConfig,
    headers: HeaderMap,
}

impl GitHubAdapter {
    /// Create a new GitHub adapter backed by reqwest
    pub fn new(config: ApiClientConfig) -> ForgeResult<Self> {
        let client = ReqwestHttpClient::new(config.timeout_seconds)?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    pub fn with_client(config: ApiClientConfig, client: Arc<dyn HttpClient>) -> Self {
        let headers = Self::build_headers(&config);
        info!("Created GitHub adapter for {}", config.base_url);
        Self {
            client,
            config,
            headers,
        }
    }

    /// Static GitHub headers. A missing token still produces an Authorization header; GitHub
    /// rejects it with a 401 that surfaces as an error envelope.
    pub fn build_headers(config: &ApiClientConfig) -> HeaderMap {
        let token = config.access_token.as_deref().unwrap_or_default();
        build_headers(
            &[
                (AUTHORIZATION, format!("token {}", token)),
                (ACCEPT, "application/vnd.github.v3+json".to_string()),
                (USER_AGENT, "forgebridge-github".to_string()),
            ],
            config,
        )
    }


    fn repo_endpoint(owner: &str, repo: &str) -> String {
        format!("repos/{}/{}", encode_segment(owner), encode_segment(repo))
    }

    /// GET that treats every non-success status as an error
    async fn get_json(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        operation: &str,
    ) -> ForgeResult<Value> {
        let response = self
            .client
            .get(&self.config.url(endpoint), &self.headers, query)
            .await?;

        if !response.is_success() {
            return Err(response.into_error(COMPONENT, operation));
        }
        Ok(response.body)
    }

    /// List repositories of a user or organization (bare array envelope)
    pub async fn list_repositories(&self, owner: &str, per_page: Option<i64>) -> String {
        match self.fetch_repositories(owner, per_page).await {
            Ok(repos) => render(&repos),
            Err(e) => listing_error("Fetching repositories", &e),
        }
    }

    async fn fetch_repositories(
        &self,
        owner: &str,
        per_page: Option<i64>,
    ) -> ForgeResult<Vec<RepositorySummary>> {
        let endpoint = format!("users/{}/repos", encode_segment(owner));
        let query = [
            ("per_page", clamp_per_page(per_page).to_string()),
            ("sort", "updated".to_string()),
        ];
        let body = self.get_json(&endpoint, &query, "list_repositories").await?;

        let repos: Vec<GitHubRepository> = serde_json::from_value(body)?;
        debug!("Fetched {} repositories for {}", repos.len(), owner);
        Ok(repos.into_iter().map(RepositorySummary::from).collect())
    }

    /// Detailed information about one repository (plain-string errors)
    pub async fn get_repository_info(&self, owner: &str, repo: &str) -> String {
        let result: ForgeResult<RepositoryDetail> = async {
            let body = self
                .get_json(&Self::repo_endpoint(owner, repo), &[], "get_repository_info")
                .await?;
            Ok(serde_json::from_value::<GitHubRepository>(body)?.into())
        }
        .await;

        match result {
            Ok(detail) => render(&detail),
            Err(e) => plain_error("fetching repository info", &e),
        }
    }

    /// Issues of a repository, pull requests excluded (bare array envelope)
    pub async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        per_page: Option<i64>,
    ) -> String {
        match self.fetch_issues(owner, repo, state, per_page).await {
            Ok(issues) => render(&issues),
            Err(e) => listing_error("Fetching issues", &e),
        }
    }

    async fn fetch_issues(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        per_page: Option<i64>,
    ) -> ForgeResult<Vec<IssueSummary>> {
        let endpoint = format!("{}/issues", Self::repo_endpoint(owner, repo));
        let query = [
            ("state", state.to_string()),
            ("per_page", clamp_per_page(per_page).to_string()),
            ("sort", "updated".to_string()),
        ];
        let body = self.get_json(&endpoint, &query, "list_issues").await?;

        let items: Vec<Value> = serde_json::from_value(body)?;
        let total = items.len();

        let issues = items
            .into_iter()
            .filter(|item| !is_pull_request(item))
            .map(|item| serde_json::from_value::<GitHubIssue>(item).map(IssueSummary::from))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Fetched {} issues for {}/{} ({} pull requests skipped)",
            issues.len(),
            owner,
            repo,
            total - issues.len()
        );
        Ok(issues)
    }

    /// Open a new issue (plain-string errors)
    pub async fn create_issue(&self, owner: &str, repo: &str, issue: &NewIssue) -> String {
        let result: ForgeResult<CreatedIssue> = async {
            let endpoint = format!("{}/issues", Self::repo_endpoint(owner, repo));
            let response = self
                .client
                .post(&self.config.url(&endpoint), &self.headers, &issue.payload())
                .await?;

            if !response.is_success() {
                return Err(response.into_error(COMPONENT, "create_issue"));
            }
            Ok(serde_json::from_value::<GitHubIssue>(response.body)?.into())
        }
        .await;

        match result {
            Ok(created) => {
                info!("Created issue #{} in {}/{}", created.number, owner, repo);
                render(&created)
            }
            Err(e) => plain_error("creating issue", &e),
        }
    }

    /// One issue with its full body (plain-string errors)
    pub async fn get_issue(&self, owner: &str, repo: &str, issue_number: u64) -> String {
        let result: ForgeResult<IssueDetail> = async {
            let endpoint = format!("{}/issues/{}", Self::repo_endpoint(owner, repo), issue_number);
            let body = self.get_json(&endpoint, &[], "get_issue").await?;
            Ok(serde_json::from_value::<GitHubIssue>(body)?.into())
        }
        .await;

        match result {
            Ok(detail) => render(&detail),
            Err(e) => plain_error("fetching issue", &e),
        }
    }

    /// Contents node at (path, branch); `None` on 404
    async fn fetch_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> ForgeResult<Option<Value>> {
        let endpoint = format!(
            "{}/contents/{}",
            Self::repo_endpoint(owner, repo),
            encode_path(path)
        );
        let response = self
            .client
            .get(
                &self.config.url(&endpoint),
                &self.headers,
                &[("ref", branch.to_string())],
            )
            .await?;

        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(response.into_error(COMPONENT, "get_contents"));
        }
        Ok(Some(response.body))
    }

    /// Default branch to retry on after a not-found on `branch`. Any failure reading the
    /// repository metadata means no retry.
    async fn fallback_for(&self, owner: &str, repo: &str, branch: &str) -> Option<String> {
        if !fallback_applies(branch) {
            return None;
        }

        let url = self.config.url(&Self::repo_endpoint(owner, repo));
        match self.client.get(&url, &self.headers, &[]).await {
            Ok(response) if response.is_success() => {
                fallback_from_metadata(&response.body)
            }
            Ok(response) => {
                debug!(
                    "Repository metadata for {}/{} returned {}, no branch fallback",
                    owner, repo, response.status
                );
                None
            }
            Err(e) => {
                warn!("Repository metadata lookup for {}/{} failed: {}", owner, repo, e);
                None
            }
        }
    }

    /// Attempt the requested branch, then at most once the default branch.
    /// Returns the branch of the last attempt with its outcome.
    async fn lookup_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> (String, ForgeResult<Option<Value>>) {
        let first = self.fetch_contents(owner, repo, path, branch).await;
        if !matches!(first, Ok(None)) {
            return (branch.to_string(), first);
        }

        match self.fallback_for(owner, repo, branch).await {
            Some(default_branch) => {
                info!(
                    "'{}' not found on {}, retrying on default branch {}",
                    path, branch, default_branch
                );
                let second = self
                    .fetch_contents(owner, repo, path, &default_branch)
                    .await;
                (default_branch, second)
            }
            None => (branch.to_string(), first),
        }
    }

    /// Decoded content of one file, with default-branch fallback for "main"
    pub async fn get_file(&self, owner: &str, repo: &str, file_path: &str, branch: &str) -> String {
        let (branch, result) = self.lookup_file(owner, repo, file_path, branch).await;
        let location = FileLocation {
            repository: format!("{}/{}", owner, repo),
            file_path: file_path.to_string(),
            branch,
        };

        match result {
            Ok(Some(node)) => Self::render_file(location, node),
            Ok(None) => {
                let error = format!(
                    "File '{}' not found in repository {} on branch {}",
                    location.file_path, location.repository, location.branch
                );
                warn!("{}", error);
                render(&FileProblem {
                    location,
                    error,
                    suggestion: Some(LISTING_HINT),
                    file_info: None,
                })
            }
            Err(e) => {
                e.log();
                render(&FileProblem {
                    location,
                    error: format!("Error fetching file: {}", e),
                    suggestion: None,
                    file_info: None,
                })
            }
        }
    }

    fn render_file(location: FileLocation, node: Value) -> String {
        // A directory path yields an array of entries
        let kind = match &node {
            Value::Array(_) => "dir".to_string(),
            other => other
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        };

        if kind != "file" {
            let mismatch = ForgeError::TypeMismatch {
                message: format!("'{}' is not a file (it's a {})", location.file_path, kind),
                expected: "file".to_string(),
                actual: kind,
                context: ErrorContext::new(COMPONENT).with_operation("get_file"),
            };
            mismatch.log();
            return render(&FileProblem {
                location,
                error: mismatch.to_string(),
                suggestion: Some("Use list_repository_contents to see directory contents."),
                file_info: None,
            });
        }

        let file: GitHubContent = match serde_json::from_value(node) {
            Ok(file) => file,
            Err(e) => {
                return render(&FileProblem {
                    location,
                    error: format!("Error fetching file: {}", ForgeError::from(e)),
                    suggestion: None,
                    file_info: None,
                })
            }
        };

        let raw = file.content.as_deref().unwrap_or_default();
        match decode_base64_text(raw, COMPONENT) {
            Ok(text) => render(&FileContent {
                location,
                size: file.size,
                encoding: file.encoding.unwrap_or_else(|| "base64".to_string()),
                content: truncate_content(text),
                download_url: file.download_url,
                last_modified: file.sha,
            }),
            Err(e) => {
                debug!("{} is not displayable as text: {}", file.path, e);
                render(&FileProblem {
                    location,
                    error: "File appears to be binary and cannot be displayed as text"
                        .to_string(),
                    suggestion: None,
                    file_info: Some(FileInfo {
                        size: file.size,
                        encoding: file.encoding.unwrap_or_else(|| "unknown".to_string()),
                    }),
                })
            }
        }
    }

    /// Entries of a directory, directories first
    pub async fn list_repository_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> String {
        let location = DirectoryLocation {
            repository: format!("{}/{}", owner, repo),
            path: display_path(path).to_string(),
            branch: branch.to_string(),
        };

        let node = match self.fetch_contents(owner, repo, path, branch).await {
            Ok(Some(node)) => node,
            Ok(None) => {
                let error = format!(
                    "Path '{}' not found in repository {} on branch {}",
                    path, location.repository, branch
                );
                return render(&DirectoryProblem { location, error });
            }
            Err(e) => {
                e.log();
                return render(&DirectoryProblem {
                    location,
                    error: format!("Error fetching contents: {}", e),
                });
            }
        };

        match Self::project_contents(node) {
            Ok(Contents::Single(file_info)) => render(&SingleFileListing {
                location,
                kind: "file",
                file_info,
            }),
            Ok(Contents::Directory(contents)) => render(&DirectoryListing {
                location,
                total_items: contents.len(),
                contents,
            }),
            Err(e) => render(&DirectoryProblem {
                location,
                error: format!("Error fetching contents: {}", e),
            }),
        }
    }

    fn project_contents(node: Value) -> ForgeResult<Contents> {
        if node.is_object() {
            let file: GitHubContent = serde_json::from_value(node)?;
            return Ok(Contents::Single(SingleFileInfo {
                name: file.name,
                size: file.size,
                kind: file.kind,
            }));
        }

        let items: Vec<GitHubContent> = serde_json::from_value(node)?;
        let mut entries: Vec<ContentsEntry> = items
            .into_iter()
            .map(|item| ContentsEntry {
                size: (item.kind == "file").then_some(item.size),
                name: item.name,
                kind: item.kind,
                path: item.path,
            })
            .collect();
        sort_entries(&mut entries);
        Ok(Contents::Directory(entries))
    }

    /// Repository search (`{total_count, repositories}` envelope)
    pub async fn search_repositories(
        &self,
        query: &str,
        sort: &str,
        order: &str,
        per_page: Option<i64>,
    ) -> String {
        match self.fetch_search(query, sort, order, per_page).await {
            Ok(results) => render(&results),
            Err(e) => listing_error("Searching repositories", &e),
        }
    }

    async fn fetch_search(
        &self,
        query: &str,
        sort: &str,
        order: &str,
        per_page: Option<i64>,
    ) -> ForgeResult<RepositorySearchResults> {
        let params = [
            ("q", query.to_string()),
            ("sort", sort.to_string()),
            ("order", order.to_string()),
            ("per_page", clamp_per_page(per_page).to_string()),
        ];
        let body = self
            .get_json("search/repositories", &params, "search_repositories")
            .await?;

        let response: GitHubSearchResponse = serde_json::from_value(body)?;
        Ok(RepositorySearchResults {
            total_count: response.total_count,
            repositories: response
                .items
                .into_iter()
                .map(RepositorySearchItem::from)
                .collect(),
        })
    }
}

enum Contents {
    Single(SingleFileInfo),
    Directory(Vec<ContentsEntry>),
}
