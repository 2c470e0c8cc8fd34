//! GitLab tool catalog
//!
//! `list_issues`, `create_issue`, `get_issue` and `get_file` are kept as aliases of
//! their `gitlab_`-prefixed tools for older clients.

use async_trait::async_trait;
use forgebridge_core::{
    log_operation_error, log_operation_start, log_operation_success,
    performance::measure_async, ForgeResult,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    default_branch_argument, integer_property, number_from_any, object_schema, parse_arguments,
    per_page_property, string_default, string_list_property, string_property, text_from_any,
    unknown_tool, Forge, ToolProvider, ToolSpec,
};
use crate::api::gitlab::NewIssue;
use crate::api::GitLabAdapter;

/// Alias name and the tool it stands for
pub const ALIASES: [(&str, &str); 4] = [
    ("list_issues", "gitlab_list_issues"),
    ("create_issue", "gitlab_create_issue"),
    ("get_issue", "gitlab_get_issue"),
    ("get_file", "gitlab_get_file"),
];

/// Canonical tool name for `name`
pub fn canonical_name(name: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, target)| *target)
        .unwrap_or(name)
}

#[derive(Debug, Deserialize)]
struct ListProjectsArgs {
    owner: Option<String>,
    per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ProjectArgs {
    #[serde(deserialize_with = "text_from_any")]
    project_id: String,
}

fn default_state() -> String {
    "opened".to_string()
}

/// Shared by issue and merge request listings
#[derive(Debug, Deserialize)]
struct ListByStateArgs {
    #[serde(deserialize_with = "text_from_any")]
    project_id: String,
    #[serde(default = "default_state")]
    state: String,
    per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CreateIssueArgs {
    #[serde(deserialize_with = "text_from_any")]
    project_id: String,
    title: String,
    #[serde(default)]
    description: String,
    labels: Option<Vec<String>>,
    assignee_ids: Option<Vec<u64>>,
}

#[derive(Debug, Deserialize)]
struct GetIssueArgs {
    #[serde(deserialize_with = "text_from_any")]
    project_id: String,
    #[serde(deserialize_with = "number_from_any")]
    issue_iid: u64,
}

#[derive(Debug, Deserialize)]
struct GetFileArgs {
    #[serde(deserialize_with = "text_from_any")]
    project_id: String,
    file_path: String,
    #[serde(default = "default_branch_argument")]
    branch: String,
}

#[derive(Debug, Deserialize)]
struct TreeArgs {
    #[serde(deserialize_with = "text_from_any")]
    project_id: String,
    #[serde(default)]
    path: String,
    #[serde(default = "default_branch_argument")]
    branch: String,
}

fn default_order_by() -> String {
    "last_activity_at".to_string()
}

fn default_sort() -> String {
    "desc".to_string()
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default = "default_order_by")]
    order_by: String,
    #[serde(default = "default_sort")]
    sort: String,
    per_page: Option<i64>,
}

/// The GitLab tools, backed by a [`GitLabAdapter`]
pub struct GitLabTools {
    adapter: GitLabAdapter,
}

impl GitLabTools {
    pub fn new(adapter: GitLabAdapter) -> Self {
        Self { adapter }
    }

    async fn dispatch(&self, name: &str, arguments: Value) -> ForgeResult<String> {
        let adapter = &self.adapter;
        let canonical = canonical_name(name);

        let output = match canonical {
            "list_projects" => {
                let args: ListProjectsArgs = parse_arguments(canonical, arguments)?;
                let owner = args.owner.as_deref().filter(|o| !o.is_empty());
                adapter.list_projects(owner, args.per_page).await
            }
            "get_project_info" => {
                let args: ProjectArgs = parse_arguments(canonical, arguments)?;
                adapter.get_project_info(&args.project_id).await
            }
            "gitlab_list_issues" => {
                let args: ListByStateArgs = parse_arguments(canonical, arguments)?;
                adapter
                    .list_issues(&args.project_id, &args.state, args.per_page)
                    .await
            }
            "gitlab_create_issue" => {
                let args: CreateIssueArgs = parse_arguments(canonical, arguments)?;
                let issue = NewIssue {
                    title: args.title,
                    description: args.description,
                    labels: args.labels.unwrap_or_default(),
                    assignee_ids: args.assignee_ids.unwrap_or_default(),
                };
                adapter.create_issue(&args.project_id, &issue).await
            }
            "gitlab_get_issue" => {
                let args: GetIssueArgs = parse_arguments(canonical, arguments)?;
                adapter.get_issue(&args.project_id, args.issue_iid).await
            }
            "gitlab_get_file" => {
                let args: GetFileArgs = parse_arguments(canonical, arguments)?;
                adapter
                    .get_file(&args.project_id, &args.file_path, &args.branch)
                    .await
            }
            "list_repository_tree" => {
                let args: TreeArgs = parse_arguments(canonical, arguments)?;
                adapter
                    .list_repository_tree(&args.project_id, &args.path, &args.branch)
                    .await
            }
            "search_projects" => {
                let args: SearchArgs = parse_arguments(canonical, arguments)?;
                adapter
                    .search_projects(&args.query, &args.order_by, &args.sort, args.per_page)
                    .await
            }
            "list_merge_requests" => {
                let args: ListByStateArgs = parse_arguments(canonical, arguments)?;
                adapter
                    .list_merge_requests(&args.project_id, &args.state, args.per_page)
                    .await
            }
            _ => return Err(unknown_tool(Forge::GitLab, name)),
        };

        Ok(output)
    }
}

#[async_trait]
impl ToolProvider for GitLabTools {
    fn forge(&self) -> Forge {
        Forge::GitLab
    }

    fn tools(&self) -> Vec<ToolSpec> {
        catalog()
    }

    async fn call(&self, name: &str, arguments: Value) -> ForgeResult<String> {
        let canonical = canonical_name(name);
        log_operation_start!("gitlab_tool", tool = name, canonical = canonical);
        let result = measure_async(canonical, self.dispatch(name, arguments)).await;
        let output = match result {
            Ok(output) => output,
            Err(e) => {
                log_operation_error!("gitlab_tool", e, tool = name);
                return Err(e);
            }
        };
        log_operation_success!("gitlab_tool", tool = name, bytes = output.len());
        Ok(output)
    }
}

fn project_id_property() -> Value {
    string_property("Project ID or path (e.g., \"123\" or \"group/project\")")
}

/// Tool descriptors in catalog order, aliases last
pub fn catalog() -> Vec<ToolSpec> {
    let project_id = project_id_property();

    let list_issues_schema = object_schema(
        json!({
            "project_id": project_id,
            "state": string_default("Issue state ('opened', 'closed', or 'all')", "opened"),
            "per_page": per_page_property("issues"),
        }),
        &["project_id"],
    );
    let create_issue_schema = object_schema(
        json!({
            "project_id": project_id,
            "title": string_property("Issue title"),
            "description": string_default("Issue description", ""),
            "labels": string_list_property("List of label names to apply"),
            "assignee_ids": {
                "type": "array",
                "items": { "type": "integer" },
                "description": "List of user IDs to assign",
            },
        }),
        &["project_id", "title"],
    );
    let get_issue_schema = object_schema(
        json!({
            "project_id": project_id,
            "issue_iid": integer_property("Issue internal ID (the number shown in the UI)"),
        }),
        &["project_id", "issue_iid"],
    );
    let get_file_schema = object_schema(
        json!({
            "project_id": project_id,
            "file_path": string_property("Path to the file (e.g., \"README.md\", \"src/index.js\")"),
            "branch": string_default("Branch name", "main"),
        }),
        &["project_id", "file_path"],
    );

    let mut tools = vec![
        ToolSpec::new(
            "list_projects",
            "List projects for a user/group or all accessible projects.",
            object_schema(
                json!({
                    "owner": string_property("GitLab username or group name (optional, lists all accessible if not provided)"),
                    "per_page": per_page_property("projects"),
                }),
                &[],
            ),
        ),
        ToolSpec::new(
            "get_project_info",
            "Get detailed information about a specific project.",
            object_schema(json!({ "project_id": project_id }), &["project_id"]),
        ),
        ToolSpec::new(
            "gitlab_list_issues",
            "List issues for a project.",
            list_issues_schema.clone(),
        ),
        ToolSpec::new(
            "gitlab_create_issue",
            "Create a new issue in a project.",
            create_issue_schema.clone(),
        ),
        ToolSpec::new(
            "gitlab_get_issue",
            "Get detailed information about a specific issue.",
            get_issue_schema.clone(),
        ),
        ToolSpec::new(
            "gitlab_get_file",
            "Get the content of any file from a project. A missing file on 'main' is retried on the project's default branch.",
            get_file_schema.clone(),
        ),
        ToolSpec::new(
            "list_repository_tree",
            "List the contents of a directory in a project repository, directories first.",
            object_schema(
                json!({
                    "project_id": project_id,
                    "path": string_default("Directory path (empty string for root directory)", ""),
                    "branch": string_default("Branch name", "main"),
                }),
                &["project_id"],
            ),
        ),
        ToolSpec::new(
            "search_projects",
            "Search for projects on GitLab.",
            object_schema(
                json!({
                    "query": string_property("Search query"),
                    "order_by": string_default("Sort field ('id', 'name', 'path', 'created_at', 'updated_at', 'last_activity_at')", "last_activity_at"),
                    "sort": string_default("Sort order ('asc' or 'desc')", "desc"),
                    "per_page": per_page_property("results"),
                }),
                &["query"],
            ),
        ),
        ToolSpec::new(
            "list_merge_requests",
            "List merge requests for a project.",
            object_schema(
                json!({
                    "project_id": project_id,
                    "state": string_default("Merge request state ('opened', 'closed', 'merged', or 'all')", "opened"),
                    "per_page": per_page_property("merge requests"),
                }),
                &["project_id"],
            ),
        ),
    ];

    for (alias, target) in ALIASES {
        let schema = match target {
            "gitlab_list_issues" => list_issues_schema.clone(),
            "gitlab_create_issue" => create_issue_schema.clone(),
            "gitlab_get_issue" => get_issue_schema.clone(),
            _ => get_file_schema.clone(),
        };
        tools.push(ToolSpec::new(
            alias,
            &format!("Alias for {} for backward compatibility.", target),
            schema,
        ));
    }

    tools
}
