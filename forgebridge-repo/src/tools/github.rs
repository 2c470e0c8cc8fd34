//! GitHub tool catalog

use async_trait::async_trait;
use forgebridge_core::{
    log_operation_error, log_operation_start, log_operation_success,
    performance::measure_async, ForgeResult,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    default_branch_argument, integer_property, number_from_any, object_schema, parse_arguments,
    per_page_property, string_default, string_list_property, string_property, unknown_tool, Forge,
    ToolProvider, ToolSpec,
};
use crate::api::github::NewIssue;
use crate::api::GitHubAdapter;

#[derive(Debug, Deserialize)]
struct ListRepositoriesArgs {
    owner: String,
    per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RepositoryArgs {
    owner: String,
    repo: String,
}

fn default_issue_state() -> String {
    "open".to_string()
}

#[derive(Debug, Deserialize)]
struct ListIssuesArgs {
    owner: String,
    repo: String,
    #[serde(default = "default_issue_state")]
    state: String,
    per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CreateIssueArgs {
    owner: String,
    repo: String,
    title: String,
    #[serde(default)]
    body: String,
    labels: Option<Vec<String>>,
    assignees: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct GetIssueArgs {
    owner: String,
    repo: String,
    #[serde(deserialize_with = "number_from_any")]
    issue_number: u64,
}

#[derive(Debug, Deserialize)]
struct GetFileArgs {
    owner: String,
    repo: String,
    file_path: String,
    #[serde(default = "default_branch_argument")]
    branch: String,
}

#[derive(Debug, Deserialize)]
struct ListContentsArgs {
    owner: String,
    repo: String,
    #[serde(default)]
    path: String,
    #[serde(default = "default_branch_argument")]
    branch: String,
}

fn default_search_sort() -> String {
    "stars".to_string()
}

fn default_search_order() -> String {
    "desc".to_string()
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default = "default_search_sort")]
    sort: String,
    #[serde(default = "default_search_order")]
    order: String,
    per_page: Option<i64>,
}

/// The GitHub tools, backed by a [`GitHubAdapter`]
pub struct GitHubTools {
    adapter: GitHubAdapter,
}

impl GitHubTools {
    pub fn new(adapter: GitHubAdapter) -> Self {
        Self { adapter }
    }

    async fn dispatch(&self, name: &str, arguments: Value) -> ForgeResult<String> {
        let adapter = &self.adapter;

        let output = match name {
            "list_repositories" => {
                let args: ListRepositoriesArgs = parse_arguments(name, arguments)?;
                adapter.list_repositories(&args.owner, args.per_page).await
            }
            "get_repository_info" => {
                let args: RepositoryArgs = parse_arguments(name, arguments)?;
                adapter.get_repository_info(&args.owner, &args.repo).await
            }
            "list_issues" => {
                let args: ListIssuesArgs = parse_arguments(name, arguments)?;
                adapter
                    .list_issues(&args.owner, &args.repo, &args.state, args.per_page)
                    .await
            }
            "create_issue" => {
                let args: CreateIssueArgs = parse_arguments(name, arguments)?;
                let issue = NewIssue {
                    title: args.title,
                    body: args.body,
                    labels: args.labels.unwrap_or_default(),
                    assignees: args.assignees.unwrap_or_default(),
                };
                adapter.create_issue(&args.owner, &args.repo, &issue).await
            }
            "get_issue" => {
                let args: GetIssueArgs = parse_arguments(name, arguments)?;
                adapter
                    .get_issue(&args.owner, &args.repo, args.issue_number)
                    .await
            }
            "get_file" => {
                let args: GetFileArgs = parse_arguments(name, arguments)?;
                adapter
                    .get_file(&args.owner, &args.repo, &args.file_path, &args.branch)
                    .await
            }
            "list_repository_contents" => {
                let args: ListContentsArgs = parse_arguments(name, arguments)?;
                adapter
                    .list_repository_contents(&args.owner, &args.repo, &args.path, &args.branch)
                    .await
            }
            "search_repositories" => {
                let args: SearchArgs = parse_arguments(name, arguments)?;
                adapter
                    .search_repositories(&args.query, &args.sort, &args.order, args.per_page)
                    .await
            }
            _ => return Err(unknown_tool(Forge::GitHub, name)),
        };

        Ok(output)
    }
}

#[async_trait]
impl ToolProvider for GitHubTools {
    fn forge(&self) -> Forge {
        Forge::GitHub
    }

    fn tools(&self) -> Vec<ToolSpec> {
        catalog()
    }

    async fn call(&self, name: &str, arguments: Value) -> ForgeResult<String> {
        log_operation_start!("github_tool", tool = name);
        let result = measure_async(name, self.dispatch(name, arguments)).await;
        let output = match result {
            Ok(output) => output,
            Err(e) => {
                log_operation_error!("github_tool", e, tool = name);
                return Err(e);
            }
        };
        log_operation_success!("github_tool", tool = name, bytes = output.len());
        Ok(output)
    }
}

fn owner_repo() -> (Value, Value) {
    (
        string_property("Repository owner (username or organization)"),
        string_property("Repository name"),
    )
}

/// Tool descriptors in catalog order
pub fn catalog() -> Vec<ToolSpec> {
    let (owner, repo) = owner_repo();

    vec![
        ToolSpec::new(
            "list_repositories",
            "List repositories for a user or organization.",
            object_schema(
                json!({
                    "owner": string_property("GitHub username or organization name"),
                    "per_page": per_page_property("repositories"),
                }),
                &["owner"],
            ),
        ),
        ToolSpec::new(
            "get_repository_info",
            "Get detailed information about a specific repository.",
            object_schema(json!({ "owner": owner, "repo": repo }), &["owner", "repo"]),
        ),
        ToolSpec::new(
            "list_issues",
            "List issues for a repository. Pull requests are excluded.",
            object_schema(
                json!({
                    "owner": owner,
                    "repo": repo,
                    "state": string_default("Issue state ('open', 'closed', or 'all')", "open"),
                    "per_page": per_page_property("issues"),
                }),
                &["owner", "repo"],
            ),
        ),
        ToolSpec::new(
            "create_issue",
            "Create a new issue in a repository.",
            object_schema(
                json!({
                    "owner": owner,
                    "repo": repo,
                    "title": string_property("Issue title"),
                    "body": string_default("Issue description/body", ""),
                    "labels": string_list_property("List of label names to apply"),
                    "assignees": string_list_property("List of usernames to assign"),
                }),
                &["owner", "repo", "title"],
            ),
        ),
        ToolSpec::new(
            "get_issue",
            "Get detailed information about a specific issue.",
            object_schema(
                json!({
                    "owner": owner,
                    "repo": repo,
                    "issue_number": integer_property("Issue number"),
                }),
                &["owner", "repo", "issue_number"],
            ),
        ),
        ToolSpec::new(
            "get_file",
            "Get the content of any file from a repository. A missing file on 'main' is retried on the repository's default branch.",
            object_schema(
                json!({
                    "owner": owner,
                    "repo": repo,
                    "file_path": string_property("Path to the file (e.g., \"README.md\", \"src/index.js\")"),
                    "branch": string_default("Branch name", "main"),
                }),
                &["owner", "repo", "file_path"],
            ),
        ),
        ToolSpec::new(
            "list_repository_contents",
            "List the contents of a directory in a repository, directories first.",
            object_schema(
                json!({
                    "owner": owner,
                    "repo": repo,
                    "path": string_default("Directory path (empty string for root directory)", ""),
                    "branch": string_default("Branch name", "main"),
                }),
                &["owner", "repo"],
            ),
        ),
        ToolSpec::new(
            "search_repositories",
            "Search for repositories on GitHub.",
            object_schema(
                json!({
                    "query": string_property("Search query"),
                    "sort": string_default("Sort field ('stars', 'forks', 'help-wanted-issues', 'updated')", "stars"),
                    "order": string_default("Sort order ('asc' or 'desc')", "desc"),
                    "per_page": per_page_property("results"),
                }),
                &["query"],
            ),
        ),
    ]
}
