//! GitLab adapter
//!
//! Normalizes GitLab REST v4 responses into the GitLab tool envelopes. Projects are
//! addressed by numeric id or by their full `group/project` path.

use forgebridge_core::{ErrorContext, ForgeError, ForgeResult};
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::common::{
    clamp_per_page, decode_base64_text, display_path, encode_segment, fallback_applies,
    fallback_from_metadata, listing_error, plain_error, render, sort_entries, truncate_content,
    truncate_optional_description, DirectoryItem,
};
use super::{build_headers, ApiClientConfig};
use crate::http::{HttpClient, ReqwestHttpClient};

const COMPONENT: &str = "gitlab_adapter";
const LISTING_HINT: &str =
    "Check the file path and branch name. Use list_repository_tree to see available files.";

/// Tree listings always ask for the largest page
const TREE_PAGE_SIZE: u32 = 100;

// ---------------------------------------------------------------------------
// Upstream shapes
// ---------------------------------------------------------------------------

fn assumed_main() -> Option<String> {
    Some("main".to_string())
}

#[derive(Debug, Deserialize)]
struct GitLabProject {
    id: u64,
    name: String,
    path_with_namespace: String,
    description: Option<String>,
    visibility: Option<String>,
    #[serde(default)]
    star_count: u64,
    #[serde(default)]
    forks_count: u64,
    /// Missing means "main"; an explicit null (empty repository) stays null
    #[serde(default = "assumed_main")]
    default_branch: Option<String>,
    created_at: Option<String>,
    last_activity_at: Option<String>,
    topics: Option<Vec<String>>,
    http_url_to_repo: Option<String>,
    ssh_url_to_repo: Option<String>,
    web_url: Option<String>,
    issues_enabled: Option<bool>,
    merge_requests_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct GitLabUser {
    username: String,
}

#[derive(Debug, Deserialize)]
struct GitLabIssue {
    iid: u64,
    id: u64,
    title: String,
    state: String,
    author: Option<GitLabUser>,
    created_at: Option<String>,
    updated_at: Option<String>,
    labels: Option<Vec<String>>,
    assignees: Option<Vec<GitLabUser>>,
    #[serde(default)]
    user_notes_count: u64,
    web_url: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabMergeRequest {
    #[serde(flatten)]
    issue: GitLabIssue,
    source_branch: Option<String>,
    target_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabFile {
    #[serde(default)]
    size: u64,
    encoding: Option<String>,
    content: Option<String>,
    last_commit_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabTreeItem {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    path: String,
    mode: Option<String>,
}

/// User or group search hit
#[derive(Debug, Deserialize)]
struct GitLabNamespace {
    id: u64,
}

// ---------------------------------------------------------------------------
// Normalized shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    pub id: u64,
    pub name: String,
    pub path_with_namespace: String,
    pub description: Option<String>,
    pub visibility: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub default_branch: Option<String>,
    pub last_activity_at: Option<String>,
    pub web_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    pub id: u64,
    pub name: String,
    pub path_with_namespace: String,
    pub description: Option<String>,
    pub visibility: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub default_branch: Option<String>,
    pub created_at: Option<String>,
    pub last_activity_at: Option<String>,
    pub topics: Vec<String>,
    pub http_url_to_repo: Option<String>,
    pub ssh_url_to_repo: Option<String>,
    pub web_url: Option<String>,
    pub issues_enabled: Option<bool>,
    pub merge_requests_enabled: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ProjectSearchItem {
    pub id: u64,
    pub name: String,
    pub path_with_namespace: String,
    pub description: Option<String>,
    pub visibility: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub last_activity_at: Option<String>,
    pub web_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectSearchResults {
    pub total_results: usize,
    pub projects: Vec<ProjectSearchItem>,
}

#[derive(Debug, Serialize)]
pub struct IssueSummary {
    pub iid: u64,
    pub id: u64,
    pub title: String,
    pub state: String,
    pub author: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub user_notes_count: u64,
    pub web_url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IssueDetail {
    pub iid: u64,
    pub id: u64,
    pub title: String,
    pub state: String,
    pub author: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub user_notes_count: u64,
    pub description: Option<String>,
    pub web_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedIssue {
    pub iid: u64,
    pub id: u64,
    pub title: String,
    pub web_url: Option<String>,
    pub state: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MergeRequestSummary {
    pub iid: u64,
    pub id: u64,
    pub title: String,
    pub state: String,
    pub author: Option<String>,
    pub source_branch: Option<String>,
    pub target_branch: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub user_notes_count: u64,
    pub web_url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TreeEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub mode: Option<String>,
}

impl DirectoryItem for TreeEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn is_directory(&self) -> bool {
        self.kind == "tree"
    }
}

#[derive(Debug, Serialize)]
struct FileLocation {
    project: String,
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
    last_commit_id: Option<String>,
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
struct TreeLocation {
    project: String,
    path: String,
    branch: String,
}

#[derive(Debug, Serialize)]
struct TreeListing {
    #[serde(flatten)]
    location: TreeLocation,
    total_items: usize,
    contents: Vec<TreeEntry>,
}

#[derive(Debug, Serialize)]
struct TreeProblem {
    #[serde(flatten)]
    location: TreeLocation,
    error: String,
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

impl From<GitLabProject> for ProjectSummary {
    fn from(project: GitLabProject) -> Self {
        Self {
            id: project.id,
            name: project.name,
            path_with_namespace: project.path_with_namespace,
            description: project.description,
            visibility: project.visibility,
            stars: project.star_count,
            forks: project.forks_count,
            default_branch: project.default_branch,
            last_activity_at: project.last_activity_at,
            web_url: project.web_url,
        }
    }
}

impl From<GitLabProject> for ProjectDetail {
    fn from(project: GitLabProject) -> Self {
        Self {
            id: project.id,
            name: project.name,
            path_with_namespace: project.path_with_namespace,
            description: project.description,
            visibility: project.visibility,
            stars: project.star_count,
            forks: project.forks_count,
            default_branch: project.default_branch,
            created_at: project.created_at,
            last_activity_at: project.last_activity_at,
            topics: project.topics.unwrap_or_default(),
            http_url_to_repo: project.http_url_to_repo,
            ssh_url_to_repo: project.ssh_url_to_repo,
            web_url: project.web_url,
            issues_enabled: project.issues_enabled,
            merge_requests_enabled: project.merge_requests_enabled,
        }
    }
}

impl From<GitLabProject> for ProjectSearchItem {
    fn from(project: GitLabProject) -> Self {
        Self {
            id: project.id,
            name: project.name,
            path_with_namespace: project.path_with_namespace,
            description: project.description,
            visibility: project.visibility,
            stars: project.star_count,
            forks: project.forks_count,
            last_activity_at: project.last_activity_at,
            web_url: project.web_url,
        }
    }
}

fn usernames(users: Option<Vec<GitLabUser>>) -> Vec<String> {
    users
        .unwrap_or_default()
        .into_iter()
        .map(|u| u.username)
        .collect()
}

impl From<GitLabIssue> for IssueSummary {
    fn from(issue: GitLabIssue) -> Self {
        Self {
            iid: issue.iid,
            id: issue.id,
            title: issue.title,
            state: issue.state,
            author: issue.author.map(|a| a.username),
            created_at: issue.created_at,
            updated_at: issue.updated_at,
            labels: issue.labels.unwrap_or_default(),
            assignees: usernames(issue.assignees),
            user_notes_count: issue.user_notes_count,
            web_url: issue.web_url,
            description: truncate_optional_description(issue.description),
        }
    }
}

impl From<GitLabIssue> for IssueDetail {
    fn from(issue: GitLabIssue) -> Self {
        Self {
            iid: issue.iid,
            id: issue.id,
            title: issue.title,
            state: issue.state,
            author: issue.author.map(|a| a.username),
            created_at: issue.created_at,
            updated_at: issue.updated_at,
            labels: issue.labels.unwrap_or_default(),
            assignees: usernames(issue.assignees),
            user_notes_count: issue.user_notes_count,
            description: issue.description,
            web_url: issue.web_url,
        }
    }
}

impl From<GitLabIssue> for CreatedIssue {
    fn from(issue: GitLabIssue) -> Self {
        Self {
            iid: issue.iid,
            id: issue.id,
            title: issue.title,
            web_url: issue.web_url,
            state: issue.state,
            created_at: issue.created_at,
        }
    }
}

impl From<GitLabMergeRequest> for MergeRequestSummary {
    fn from(mr: GitLabMergeRequest) -> Self {
        let issue = IssueSummary::from(mr.issue);
        Self {
            iid: issue.iid,
            id: issue.id,
            title: issue.title,
            state: issue.state,
            author: issue.author,
            source_branch: mr.source_branch,
            target_branch: mr.target_branch,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
            labels: issue.labels,
            assignees: issue.assignees,
            user_notes_count: issue.user_notes_count,
            web_url: issue.web_url,
            description: issue.description,
        }
    }
}

/// Arguments of `gitlab_create_issue`
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub labels: Vec<String>,
    pub assignee_ids: Vec<u64>,
}

impl NewIssue {
    fn payload(&self) -> Value {
        let mut payload = json!({
            "title": self.title,
            "description": self.description,
        });
        if !self.labels.is_empty() {
            payload["labels"] = json!(self.labels.join(","));
        }
        if !self.assignee_ids.is_empty() {
            payload["assignee_ids"] = json!(self.assignee_ids);
        }
        payload
    }
}

/// Owner name resolved to a numeric namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedOwner {
    User(u64),
    Group(u64),
}

impl ResolvedOwner {
    pub fn projects_endpoint(&self) -> String {
        match self {
            ResolvedOwner::User(id) => format!("users/{}/projects", id),
            ResolvedOwner::Group(id) => format!("groups/{}/projects", id),
        }
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// GitLab API adapter
pub struct GitLabAdapter {
    client: Arc<dyn HttpClient>,
    config: ApiClientConfig,
    headers: HeaderMap,
}

impl GitLabAdapter {
    /// Create a new GitLab adapter backed by reqwest
    pub fn new(config: ApiClientConfig) -> ForgeResult<Self> {
        let client = ReqwestHttpClient::new(config.timeout_seconds)?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    pub fn with_client(config: ApiClientConfig, client: Arc<dyn HttpClient>) -> Self {
        let headers = Self::build_headers(&config);
        info!("Created GitLab adapter for {}", config.base_url);
        Self {
            client,
            config,
            headers,
        }
    }

    /// Static GitLab headers; built even without a token (GitLab then answers 401)
    pub fn build_headers(config: &ApiClientConfig) -> HeaderMap {
        let token = config.access_token.as_deref().unwrap_or_default();
        build_headers(
            &[
                (AUTHORIZATION, format!("Bearer {}", token)),
                (CONTENT_TYPE, "application/json".to_string()),
                (USER_AGENT, "forgebridge-gitlab".to_string()),
            ],
            config,
        )
    }


    fn project_endpoint(project_id: &str) -> String {
        format!("projects/{}", encode_segment(project_id))
    }

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

    /// Resolve an owner name: users by exact username first, then groups by search.
    /// The first hit wins; similar names are not disambiguated.
    pub async fn resolve_owner(&self, owner: &str) -> ForgeResult<ResolvedOwner> {
        let users: Vec<GitLabNamespace> = serde_json::from_value(
            self.get_json("users", &[("username", owner.to_string())], "resolve_user")
                .await?,
        )?;
        if let Some(user) = users.first() {
            debug!("Resolved '{}' to user {}", owner, user.id);
            return Ok(ResolvedOwner::User(user.id));
        }

        let groups: Vec<GitLabNamespace> = serde_json::from_value(
            self.get_json("groups", &[("search", owner.to_string())], "resolve_group")
                .await?,
        )?;
        if let Some(group) = groups.first() {
            debug!("Resolved '{}' to group {}", owner, group.id);
            return Ok(ResolvedOwner::Group(group.id));
        }

        Err(ForgeError::Resolution {
            owner: owner.to_string(),
            context: ErrorContext::new(COMPONENT)
                .with_operation("resolve_owner")
                .with_suggestion("Check the username or group name"),
        })
    }

    /// Projects of a user or group, or every accessible project without an owner
    pub async fn list_projects(&self, owner: Option<&str>, per_page: Option<i64>) -> String {
        let endpoint = match owner {
            Some(owner) => match self.resolve_owner(owner).await {
                Ok(resolved) => resolved.projects_endpoint(),
                Err(e) => return listing_error("Finding user/group", &e),
            },
            None => "projects".to_string(),
        };

        match self.fetch_projects(&endpoint, per_page).await {
            Ok(projects) => render(&projects),
            Err(e) => listing_error("Fetching projects", &e),
        }
    }

    async fn fetch_projects(
        &self,
        endpoint: &str,
        per_page: Option<i64>,
    ) -> ForgeResult<Vec<ProjectSummary>> {
        let query = [
            ("per_page", clamp_per_page(per_page).to_string()),
            ("order_by", "last_activity_at".to_string()),
            ("sort", "desc".to_string()),
        ];
        let body = self.get_json(endpoint, &query, "list_projects").await?;

        let projects: Vec<GitLabProject> = serde_json::from_value(body)?;
        Ok(projects.into_iter().map(ProjectSummary::from).collect())
    }

    /// Detailed information about one project (plain-string errors)
    pub async fn get_project_info(&self, project_id: &str) -> String {
        let result: ForgeResult<ProjectDetail> = async {
            let body = self
                .get_json(&Self::project_endpoint(project_id), &[], "get_project_info")
                .await?;
            Ok(serde_json::from_value::<GitLabProject>(body)?.into())
        }
        .await;

        match result {
            Ok(detail) => render(&detail),
            Err(e) => plain_error("fetching project info", &e),
        }
    }

    fn state_query(state: &str, per_page: Option<i64>) -> [(&'static str, String); 4] {
        [
            ("state", state.to_string()),
            ("per_page", clamp_per_page(per_page).to_string()),
            ("order_by", "updated_at".to_string()),
            ("sort", "desc".to_string()),
        ]
    }

    /// Issues of a project (bare array envelope, no filtering)
    pub async fn list_issues(&self, project_id: &str, state: &str, per_page: Option<i64>) -> String {
        let result: ForgeResult<Vec<IssueSummary>> = async {
            let endpoint = format!("{}/issues", Self::project_endpoint(project_id));
            let body = self
                .get_json(&endpoint, &Self::state_query(state, per_page), "list_issues")
                .await?;
            let issues: Vec<GitLabIssue> = serde_json::from_value(body)?;
            Ok(issues.into_iter().map(IssueSummary::from).collect())
        }
        .await;

        match result {
            Ok(issues) => render(&issues),
            Err(e) => listing_error("Fetching issues", &e),
        }
    }

    /// Open a new issue (plain-string errors)
    pub async fn create_issue(&self, project_id: &str, issue: &NewIssue) -> String {
        let result: ForgeResult<CreatedIssue> = async {
            let endpoint = format!("{}/issues", Self::project_endpoint(project_id));
            let response = self
                .client
                .post(&self.config.url(&endpoint), &self.headers, &issue.payload())
                .await?;

            if !response.is_success() {
                return Err(response.into_error(COMPONENT, "create_issue"));
            }
            Ok(serde_json::from_value::<GitLabIssue>(response.body)?.into())
        }
        .await;

        match result {
            Ok(created) => {
                info!("Created issue !{} in {}", created.iid, project_id);
                render(&created)
            }
            Err(e) => plain_error("creating issue", &e),
        }
    }

    /// One issue by its project-local iid (plain-string errors)
    pub async fn get_issue(&self, project_id: &str, issue_iid: u64) -> String {
        let result: ForgeResult<IssueDetail> = async {
            let endpoint = format!("{}/issues/{}", Self::project_endpoint(project_id), issue_iid);
            let body = self.get_json(&endpoint, &[], "get_issue").await?;
            Ok(serde_json::from_value::<GitLabIssue>(body)?.into())
        }
        .await;

        match result {
            Ok(detail) => render(&detail),
            Err(e) => plain_error("fetching issue", &e),
        }
    }

    /// File at (path, branch); `None` on 404
    async fn fetch_file(
        &self,
        project_id: &str,
        file_path: &str,
        branch: &str,
    ) -> ForgeResult<Option<Value>> {
        let endpoint = format!(
            "{}/repository/files/{}",
            Self::project_endpoint(project_id),
            encode_segment(file_path)
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
            return Err(response.into_error(COMPONENT, "get_file"));
        }
        Ok(Some(response.body))
    }

    /// Default branch to retry on after a not-found on `branch`
    async fn fallback_for(&self, project_id: &str, branch: &str) -> Option<String> {
        if !fallback_applies(branch) {
            return None;
        }

        let url = self.config.url(&Self::project_endpoint(project_id));
        match self.client.get(&url, &self.headers, &[]).await {
            Ok(response) if response.is_success() => {
                fallback_from_metadata(&response.body)
            }
            Ok(response) => {
                debug!(
                    "Project metadata for {} returned {}, no branch fallback",
                    project_id, response.status
                );
                None
            }
            Err(e) => {
                warn!("Project metadata lookup for {} failed: {}", project_id, e);
                None
            }
        }
    }

    /// Requested branch, then at most one retry on the default branch
    async fn lookup_file(
        &self,
        project_id: &str,
        file_path: &str,
        branch: &str,
    ) -> (String, ForgeResult<Option<Value>>) {
        let first = self.fetch_file(project_id, file_path, branch).await;
        if !matches!(first, Ok(None)) {
            return (branch.to_string(), first);
        }

        match self.fallback_for(project_id, branch).await {
            Some(default_branch) => {
                info!(
                    "'{}' not found on {}, retrying on default branch {}",
                    file_path, branch, default_branch
                );
                let second = self.fetch_file(project_id, file_path, &default_branch).await;
                (default_branch, second)
            }
            None => (branch.to_string(), first),
        }
    }

    /// Decoded content of one file, with default-branch fallback for "main"
    pub async fn get_file(&self, project_id: &str, file_path: &str, branch: &str) -> String {
        let (branch, result) = self.lookup_file(project_id, file_path, branch).await;
        let location = FileLocation {
            project: project_id.to_string(),
            file_path: file_path.to_string(),
            branch,
        };

        let file: GitLabFile = match result.and_then(|body| match body {
            Some(body) => Ok(Some(serde_json::from_value::<GitLabFile>(body)?)),
            None => Ok(None),
        }) {
            Ok(Some(file)) => file,
            Ok(None) => {
                let error = format!(
                    "File '{}' not found in project {} on branch {}",
                    location.file_path, location.project, location.branch
                );
                warn!("{}", error);
                return render(&FileProblem {
                    location,
                    error,
                    suggestion: Some(LISTING_HINT),
                    file_info: None,
                });
            }
            Err(e) => {
                e.log();
                return render(&FileProblem {
                    location,
                    error: format!("Error fetching file: {}", e),
                    suggestion: None,
                    file_info: None,
                });
            }
        };

        let encoding = file.encoding.unwrap_or_else(|| "base64".to_string());
        match decode_base64_text(file.content.as_deref().unwrap_or_default(), COMPONENT) {
            Ok(text) => render(&FileContent {
                location,
                size: file.size,
                encoding,
                content: truncate_content(text),
                last_commit_id: file.last_commit_id,
            }),
            Err(e) => {
                debug!("{} is not displayable as text: {}", location.file_path, e);
                render(&FileProblem {
                    location,
                    error: "File appears to be binary and cannot be displayed as text"
                        .to_string(),
                    suggestion: None,
                    file_info: Some(FileInfo {
                        size: file.size,
                        encoding,
                    }),
                })
            }
        }
    }

    /// Entries of a repository directory, directories first
    pub async fn list_repository_tree(&self, project_id: &str, path: &str, branch: &str) -> String {
        let location = TreeLocation {
            project: project_id.to_string(),
            path: display_path(path).to_string(),
            branch: branch.to_string(),
        };

        let endpoint = format!("{}/repository/tree", Self::project_endpoint(project_id));
        let mut query = vec![
            ("ref", branch.to_string()),
            ("per_page", TREE_PAGE_SIZE.to_string()),
        ];
        if !path.is_empty() {
            query.push(("path", path.to_string()));
        }

        let result: ForgeResult<Option<Vec<TreeEntry>>> = async {
            let response = self
                .client
                .get(&self.config.url(&endpoint), &self.headers, &query)
                .await?;
            if response.is_not_found() {
                return Ok(None);
            }
            if !response.is_success() {
                return Err(response.into_error(COMPONENT, "list_repository_tree"));
            }

            let items: Vec<GitLabTreeItem> = serde_json::from_value(response.body)?;
            let mut entries: Vec<TreeEntry> = items
                .into_iter()
                .map(|item| TreeEntry {
                    name: item.name,
                    kind: item.kind,
                    path: item.path,
                    mode: item.mode,
                })
                .collect();
            sort_entries(&mut entries);
            Ok(Some(entries))
        }
        .await;

        match result {
            Ok(Some(contents)) => render(&TreeListing {
                location,
                total_items: contents.len(),
                contents,
            }),
            Ok(None) => {
                let error = format!(
                    "Path '{}' not found in project {} on branch {}",
                    path, project_id, branch
                );
                render(&TreeProblem { location, error })
            }
            Err(e) => {
                e.log();
                render(&TreeProblem {
                    location,
                    error: format!("Error fetching tree: {}", e),
                })
            }
        }
    }

    /// Project search (`{total_results, projects}` envelope)
    pub async fn search_projects(
        &self,
        query: &str,
        order_by: &str,
        sort: &str,
        per_page: Option<i64>,
    ) -> String {
        let result: ForgeResult<ProjectSearchResults> = async {
            let params = [
                ("search", query.to_string()),
                ("order_by", order_by.to_string()),
                ("sort", sort.to_string()),
                ("per_page", clamp_per_page(per_page).to_string()),
            ];
            let body = self.get_json("projects", &params, "search_projects").await?;
            let projects: Vec<ProjectSearchItem> =
                serde_json::from_value::<Vec<GitLabProject>>(body)?
                    .into_iter()
                    .map(ProjectSearchItem::from)
                    .collect();
            Ok(ProjectSearchResults {
                total_results: projects.len(),
                projects,
            })
        }
        .await;

        match result {
            Ok(results) => render(&results),
            Err(e) => listing_error("Searching projects", &e),
        }
    }

    /// Merge requests of a project (bare array envelope)
    pub async fn list_merge_requests(
        &self,
        project_id: &str,
        state: &str,
        per_page: Option<i64>,
    ) -> String {
        let result: ForgeResult<Vec<MergeRequestSummary>> = async {
            let endpoint = format!("{}/merge_requests", Self::project_endpoint(project_id));
            let body = self
                .get_json(
                    &endpoint,
                    &Self::state_query(state, per_page),
                    "list_merge_requests",
                )
                .await?;
            let merge_requests: Vec<GitLabMergeRequest> = serde_json::from_value(body)?;
            Ok(merge_requests
                .into_iter()
                .map(MergeRequestSummary::from)
                .collect())
        }
        .await;

        match result {
            Ok(merge_requests) => render(&merge_requests),
            Err(e) => listing_error("Fetching merge requests", &e),
        }
    }
}
