//! Tests for the forge adapters

#[cfg(test)]
mod tests {
    use super::super::common::*;
    use super::super::github::{ContentsEntry, NewIssue};
    use super::super::gitlab::{self, ResolvedOwner};
    use super::super::*;
    use crate::http::stub::StubHttpClient;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
    use serde_json::{json, Value};
    use std::sync::Arc;

    const GH: &str = "https://api.github.com";
    const GL: &str = "https://gitlab.com/api/v4";

    fn github_adapter(stub: &Arc<StubHttpClient>) -> GitHubAdapter {
        GitHubAdapter::with_client(ApiClientConfig::github(Some("t0k".to_string())), stub.clone())
    }

    fn gitlab_adapter(stub: &Arc<StubHttpClient>) -> GitLabAdapter {
        GitLabAdapter::with_client(
            ApiClientConfig::gitlab(None, Some("t0k".to_string())),
            stub.clone(),
        )
    }

    fn parse(output: &str) -> Value {
        serde_json::from_str(output).expect("adapter output should be JSON")
    }

    fn issue(number: u64, title: &str) -> Value {
        json!({
            "number": number,
            "title": title,
            "state": "open",
            "user": {"login": "octocat"},
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "labels": [{"name": "bug"}],
            "assignees": [],
            "comments": 2,
            "body": "details",
            "html_url": format!("https://github.com/octo/hello/issues/{}", number)
        })
    }

    fn github_file(path: &str, raw: &[u8]) -> Value {
        json!({
            "name": path.rsplit('/').next().unwrap_or(path),
            "path": path,
            "type": "file",
            "size": raw.len(),
            "encoding": "base64",
            "content": BASE64.encode(raw),
            "sha": "abc123",
            "download_url": format!("https://raw.githubusercontent.com/octo/hello/{}", path)
        })
    }

    fn entry(name: &str, kind: &str) -> ContentsEntry {
        ContentsEntry {
            name: name.to_string(),
            kind: kind.to_string(),
            size: None,
            path: format!("root/{}", name),
        }
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    #[test]
    fn test_api_client_config_creation() {
        let github_config = ApiClientConfig::github(Some("test_token".to_string()));
        assert_eq!(github_config.base_url, "https://api.github.com");
        assert_eq!(github_config.access_token, Some("test_token".to_string()));

        let gitlab_config = ApiClientConfig::gitlab(None, Some("test_token".to_string()));
        assert_eq!(gitlab_config.base_url, "https://gitlab.com/api/v4");

        let custom = ApiClientConfig::gitlab(
            Some("https://gitlab.example.com/api/v4/".to_string()),
            None,
        );
        assert_eq!(
            custom.url("/projects"),
            "https://gitlab.example.com/api/v4/projects"
        );
    }

    #[test]
    fn test_description_truncation() {
        let exact = "a".repeat(DESCRIPTION_LIMIT);
        assert_eq!(truncate_description(&exact), exact);

        let long = "é".repeat(DESCRIPTION_LIMIT + 100);
        let cut = truncate_description(&long);
        assert!(cut.ends_with(DESCRIPTION_MARKER));
        assert_eq!(cut.chars().count(), DESCRIPTION_LIMIT + DESCRIPTION_MARKER.len());

        assert_eq!(truncate_optional_description(None), None);
    }

    #[test]
    fn test_content_truncation() {
        let short = "fn main() {}\n".to_string();
        assert_eq!(truncate_content(short.clone()), short);

        let long = "x".repeat(9000);
        let cut = truncate_content(long);
        assert!(cut.starts_with(&"x".repeat(CONTENT_LIMIT)));
        assert!(cut.ends_with("showing first 8000 characters of 9000 total)"));
        assert_eq!(
            cut.chars().count(),
            CONTENT_LIMIT + content_marker(9000).chars().count()
        );
    }

    #[test]
    fn test_paging_and_encoding() {
        assert_eq!(clamp_per_page(None), 30);
        assert_eq!(clamp_per_page(Some(0)), 1);
        assert_eq!(clamp_per_page(Some(-5)), 1);
        assert_eq!(clamp_per_page(Some(500)), 100);
        assert_eq!(clamp_per_page(Some(42)), 42);

        assert_eq!(encode_segment("group/sub/project"), "group%2Fsub%2Fproject");
        assert_eq!(encode_path("src/my file.rs"), "src/my%20file.rs");
        assert_eq!(encode_path(""), "");
    }

    #[test]
    fn test_base64_decoding() {
        let wrapped = "aGVsbG8g\nd29ybGQK\n";
        assert_eq!(decode_base64_text(wrapped, "test").unwrap(), "hello world\n");

        let binary = BASE64.encode([0xff, 0xfe, 0x00, 0x9f]);
        assert!(decode_base64_text(&binary, "test").is_err());
        assert!(decode_base64_text("!!not base64!!", "test").is_err());
    }

    #[test]
    fn test_fallback_rules() {
        assert!(fallback_applies("main"));
        assert!(!fallback_applies("develop"));
        assert!(!fallback_applies("master"));

        assert_eq!(fallback_branch(None), Some("master".to_string()));
        assert_eq!(fallback_branch(Some("trunk")), Some("trunk".to_string()));
        assert_eq!(fallback_branch(Some("main")), None);

        assert_eq!(fallback_from_metadata(&json!({})), Some("master".to_string()));
        assert_eq!(
            fallback_from_metadata(&json!({"default_branch": "trunk"})),
            Some("trunk".to_string())
        );
        assert_eq!(fallback_from_metadata(&json!({"default_branch": null})), None);
    }

    #[test]
    fn test_directory_sort_is_total() {
        let mut entries = vec![
            entry("zeta.txt", "file"),
            entry("Readme", "file"),
            entry("src", "dir"),
            entry("README", "file"),
            entry("Assets", "dir"),
            entry("alpha.rs", "file"),
        ];
        sort_entries(&mut entries);

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Assets", "src", "alpha.rs", "README", "Readme", "zeta.txt"]
        );

        for pair in entries.windows(2) {
            assert_ne!(compare_entries(&pair[0], &pair[1]), std::cmp::Ordering::Greater);
        }

        let before: Vec<String> = entries.iter().map(|e| e.path.clone()).collect();
        sort_entries(&mut entries);
        let after: Vec<String> = entries.iter().map(|e| e.path.clone()).collect();
        assert_eq!(before, after);
    }

    // -----------------------------------------------------------------------
    // GitHub
    // -----------------------------------------------------------------------

    #[test]
    fn test_github_headers() {
        let headers = GitHubAdapter::build_headers(&ApiClientConfig::github(Some(
            "secret".to_string(),
        )));
        assert_eq!(headers[AUTHORIZATION], "token secret");
        assert_eq!(headers[ACCEPT], "application/vnd.github.v3+json");
        assert_eq!(headers[USER_AGENT], "forgebridge-github");

        let anonymous = GitHubAdapter::build_headers(&ApiClientConfig::github(None));
        assert_eq!(anonymous[AUTHORIZATION], "token ");

        let custom = GitHubAdapter::build_headers(
            &ApiClientConfig::github(None)
                .with_header("X-Trace".to_string(), "1".to_string())
                .with_header("bad header".to_string(), "x".to_string()),
        );
        assert_eq!(custom["x-trace"], "1");
        assert_eq!(custom.len(), 4);
    }

    #[tokio::test]
    async fn test_list_issues_skips_pull_requests() {
        let stub = Arc::new(StubHttpClient::new());
        let mut pr = issue(4, "a pull request");
        pr["pull_request"] = json!({"url": "https://api.github.com/repos/octo/hello/pulls/4"});
        stub.on_get(
            &format!("{}/repos/octo/hello/issues", GH),
            200,
            json!([issue(1, "one"), issue(2, "two"), pr, issue(3, "three")]),
        );

        let output = parse(&github_adapter(&stub).list_issues("octo", "hello", "open", None).await);
        let issues = output.as_array().unwrap();
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0]["user"], "octocat");
        assert_eq!(issues[0]["labels"], json!(["bug"]));
        assert!(issues.iter().all(|i| i["title"] != "a pull request"));

        let request = &stub.requests()[0];
        assert_eq!(request.query_value("state"), Some("open"));
        assert_eq!(request.query_value("per_page"), Some("30"));
        assert_eq!(request.query_value("sort"), Some("updated"));
        assert_eq!(request.headers[AUTHORIZATION], "token t0k");
    }

    #[tokio::test]
    async fn test_issue_body_truncated_in_listing_only() {
        let stub = Arc::new(StubHttpClient::new());
        let mut long = issue(9, "long");
        long["body"] = json!("b".repeat(700));
        stub.on_get(&format!("{}/repos/octo/hello/issues", GH), 200, json!([long.clone()]))
            .on_get(&format!("{}/repos/octo/hello/issues/9", GH), 200, long);
        let adapter = github_adapter(&stub);

        let listed = parse(&adapter.list_issues("octo", "hello", "all", Some(5)).await);
        assert_eq!(listed[0]["body"].as_str().unwrap().chars().count(), 503);

        let detail = parse(&adapter.get_issue("octo", "hello", 9).await);
        assert_eq!(detail["body"].as_str().unwrap().len(), 700);
        assert_eq!(detail["url"], "https://github.com/octo/hello/issues/9");
    }

    #[tokio::test]
    async fn test_get_file_falls_back_to_default_branch() {
        let stub = Arc::new(StubHttpClient::new());
        let contents_url = format!("{}/repos/octo/hello/contents/README.md", GH);
        stub.on_get_with(
            &contents_url,
            &[("ref", "master")],
            200,
            github_file("README.md", b"hello world\n"),
        )
        .on_get(
            &format!("{}/repos/octo/hello", GH),
            200,
            json!({"name": "hello", "full_name": "octo/hello", "default_branch": "master"}),
        );

        let output = parse(&github_adapter(&stub).get_file("octo", "hello", "README.md", "main").await);
        assert_eq!(output["branch"], "master");
        assert_eq!(output["repository"], "octo/hello");
        assert_eq!(output["content"], "hello world\n");
        assert_eq!(output["encoding"], "base64");
        assert_eq!(output["last_modified"], "abc123");

        let requests = stub.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].query_value("ref"), Some("main"));
        assert_eq!(requests[1].url, format!("{}/repos/octo/hello", GH));
        assert_eq!(requests[2].query_value("ref"), Some("master"));
    }

    #[tokio::test]
    async fn test_get_file_no_fallback_for_other_branches() {
        let stub = Arc::new(StubHttpClient::new());

        let output = parse(&github_adapter(&stub).get_file("octo", "hello", "README.md", "develop").await);
        assert_eq!(
            output["error"],
            "File 'README.md' not found in repository octo/hello on branch develop"
        );
        assert!(output["suggestion"]
            .as_str()
            .unwrap()
            .contains("list_repository_contents"));
        assert_eq!(stub.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_get_file_fallback_skipped_when_metadata_unavailable() {
        let stub = Arc::new(StubHttpClient::new());
        stub.fail_get(&format!("{}/repos/octo/hello", GH));

        let output = parse(&github_adapter(&stub).get_file("octo", "hello", "README.md", "main").await);
        assert_eq!(output["branch"], "main");
        assert!(output["error"].as_str().unwrap().contains("not found"));
        assert_eq!(stub.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_get_file_no_retry_when_default_is_main() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(
            &format!("{}/repos/octo/hello", GH),
            200,
            json!({"default_branch": "main"}),
        );

        let output = parse(&github_adapter(&stub).get_file("octo", "hello", "README.md", "main").await);
        assert_eq!(output["branch"], "main");
        assert_eq!(stub.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_get_file_binary_content() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(
            &format!("{}/repos/octo/hello/contents/logo.png", GH),
            200,
            github_file("logo.png", &[0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe, 0x00]),
        );

        let output = parse(&github_adapter(&stub).get_file("octo", "hello", "logo.png", "main").await);
        assert_eq!(
            output["error"],
            "File appears to be binary and cannot be displayed as text"
        );
        assert_eq!(output["file_info"], json!({"size": 7, "encoding": "base64"}));
        assert!(output.get("content").is_none());
    }

    #[tokio::test]
    async fn test_get_file_on_directory() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(
            &format!("{}/repos/octo/hello/contents/src", GH),
            200,
            json!([{"name": "lib.rs", "path": "src/lib.rs", "type": "file", "size": 10}]),
        );

        let output = parse(&github_adapter(&stub).get_file("octo", "hello", "src", "main").await);
        assert_eq!(output["error"], "'src' is not a file (it's a dir)");
        assert!(output.get("content").is_none());
    }

    #[tokio::test]
    async fn test_get_file_large_content_truncated() {
        let stub = Arc::new(StubHttpClient::new());
        let text = "y".repeat(CONTENT_LIMIT + 1);
        stub.on_get(
            &format!("{}/repos/octo/hello/contents/big.txt", GH),
            200,
            github_file("big.txt", text.as_bytes()),
        );

        let output = parse(&github_adapter(&stub).get_file("octo", "hello", "big.txt", "main").await);
        assert!(output["content"]
            .as_str()
            .unwrap()
            .ends_with("showing first 8000 characters of 8001 total)"));
    }

    #[tokio::test]
    async fn test_list_repository_contents_sorted() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(
            &format!("{}/repos/octo/hello/contents/", GH),
            200,
            json!([
                {"name": "b.txt", "path": "b.txt", "type": "file", "size": 3},
                {"name": "src", "path": "src", "type": "dir", "size": 0},
                {"name": "A.md", "path": "A.md", "type": "file", "size": 5},
                {"name": "docs", "path": "docs", "type": "dir", "size": 0}
            ]),
        );

        let output = parse(
            &github_adapter(&stub)
                .list_repository_contents("octo", "hello", "", "main")
                .await,
        );
        assert_eq!(output["path"], "/");
        assert_eq!(output["total_items"], 4);
        let names: Vec<&str> = output["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["docs", "src", "A.md", "b.txt"]);
        assert_eq!(output["contents"][0]["size"], Value::Null);
        assert_eq!(output["contents"][2]["size"], 5);
    }

    #[tokio::test]
    async fn test_list_repository_contents_single_file_and_missing() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(
            &format!("{}/repos/octo/hello/contents/Cargo.toml", GH),
            200,
            github_file("Cargo.toml", b"[package]\n"),
        );
        let adapter = github_adapter(&stub);

        let single = parse(
            &adapter
                .list_repository_contents("octo", "hello", "Cargo.toml", "main")
                .await,
        );
        assert_eq!(single["type"], "file");
        assert_eq!(
            single["file_info"],
            json!({"name": "Cargo.toml", "size": 10, "type": "file"})
        );

        let missing = parse(
            &adapter
                .list_repository_contents("octo", "hello", "nope", "main")
                .await,
        );
        assert_eq!(
            missing["error"],
            "Path 'nope' not found in repository octo/hello on branch main"
        );
    }

    #[tokio::test]
    async fn test_search_repositories_reports_total_count() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(
            &format!("{}/search/repositories", GH),
            200,
            json!({
                "total_count": 500,
                "items": [
                    {"name": "a", "full_name": "x/a", "stargazers_count": 10, "html_url": "https://github.com/x/a"},
                    {"name": "b", "full_name": "x/b", "stargazers_count": 5}
                ]
            }),
        );

        let output = parse(
            &github_adapter(&stub)
                .search_repositories("language:rust", "stars", "desc", Some(2))
                .await,
        );
        assert_eq!(output["total_count"], 500);
        assert_eq!(output["repositories"].as_array().unwrap().len(), 2);
        assert_eq!(output["repositories"][0]["stars"], 10);
        assert_eq!(output["repositories"][0]["url"], "https://github.com/x/a");
        assert_eq!(stub.requests()[0].query_value("q"), Some("language:rust"));
    }

    #[tokio::test]
    async fn test_github_error_envelopes() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(
            &format!("{}/users/octo/repos", GH),
            401,
            json!({"message": "Bad credentials"}),
        );
        let adapter = github_adapter(&stub);

        let listing = parse(&adapter.list_repositories("octo", None).await);
        assert_eq!(
            listing["error"],
            "Fetching repositories failed: HTTP 401: Bad credentials"
        );

        let info = adapter.get_repository_info("octo", "missing").await;
        assert_eq!(info, "Error fetching repository info: HTTP 404: Not Found");
    }

    #[tokio::test]
    async fn test_create_issue_payload() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_post(
            &format!("{}/repos/octo/hello/issues", GH),
            201,
            issue(42, "Crash on start"),
        );

        let request = NewIssue {
            title: "Crash on start".to_string(),
            body: "steps".to_string(),
            labels: vec!["bug".to_string()],
            assignees: Vec::new(),
        };
        let output = parse(&github_adapter(&stub).create_issue("octo", "hello", &request).await);
        assert_eq!(output["number"], 42);
        assert_eq!(output["url"], "https://github.com/octo/hello/issues/42");

        let sent = stub.requests()[0].body.clone().unwrap();
        assert_eq!(sent["labels"], json!(["bug"]));
        assert!(sent.get("assignees").is_none());
    }

    // -----------------------------------------------------------------------
    // GitLab
    // -----------------------------------------------------------------------

    fn gitlab_project(id: u64, path: &str) -> Value {
        json!({
            "id": id,
            "name": path.rsplit('/').next().unwrap_or(path),
            "path_with_namespace": path,
            "visibility": "public",
            "star_count": 3,
            "forks_count": 1,
            "last_activity_at": "2024-03-01T00:00:00Z",
            "web_url": format!("https://gitlab.com/{}", path)
        })
    }

    fn gitlab_issue(iid: u64) -> Value {
        json!({
            "iid": iid,
            "id": 1000 + iid,
            "title": format!("issue {}", iid),
            "state": "opened",
            "author": {"username": "alice"},
            "labels": ["backend"],
            "assignees": [{"username": "bob"}],
            "user_notes_count": 4,
            "description": "d"
        })
    }

    #[test]
    fn test_gitlab_headers() {
        let headers = GitLabAdapter::build_headers(&ApiClientConfig::gitlab(
            None,
            Some("glpat".to_string()),
        ));
        assert_eq!(headers[AUTHORIZATION], "Bearer glpat");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[USER_AGENT], "forgebridge-gitlab");

        let mut config = forgebridge_core::ForgeBridgeConfig::default();
        config.apply_env(|key| (key == "GITLAB_TOKEN").then(|| "glpat\n".to_string()));
        let from_env = GitLabAdapter::build_headers(&ApiClientConfig::gitlab_from(&config));
        assert_eq!(from_env[AUTHORIZATION], "Bearer glpat");

        let unusable = GitLabAdapter::build_headers(&ApiClientConfig::gitlab(
            None,
            Some("bad\ntoken".to_string()),
        ));
        assert!(unusable.get(AUTHORIZATION).is_none());
        assert_eq!(unusable[USER_AGENT], "forgebridge-gitlab");
    }

    #[tokio::test]
    async fn test_gitlab_resolves_user_first() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get_with(&format!("{}/users", GL), &[("username", "alice")], 200, json!([{"id": 7}]))
            .on_get(
                &format!("{}/users/7/projects", GL),
                200,
                json!([gitlab_project(1, "alice/tools")]),
            );

        let adapter = gitlab_adapter(&stub);
        assert_eq!(adapter.resolve_owner("alice").await.unwrap(), ResolvedOwner::User(7));

        let output = parse(&adapter.list_projects(Some("alice"), None).await);
        assert_eq!(output[0]["path_with_namespace"], "alice/tools");
        assert_eq!(output[0]["stars"], 3);
        assert_eq!(output[0]["default_branch"], "main");

        let listing = stub.requests().pop().unwrap();
        assert_eq!(listing.query_value("order_by"), Some("last_activity_at"));
        assert_eq!(listing.query_value("sort"), Some("desc"));
    }

    #[tokio::test]
    async fn test_gitlab_resolves_group_after_empty_user_search() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(&format!("{}/users", GL), 200, json!([]))
            .on_get_with(&format!("{}/groups", GL), &[("search", "infra")], 200, json!([{"id": 9}]))
            .on_get(
                &format!("{}/groups/9/projects", GL),
                200,
                json!([gitlab_project(2, "infra/deploy")]),
            );

        let output = parse(&gitlab_adapter(&stub).list_projects(Some("infra"), Some(10)).await);
        assert_eq!(output[0]["id"], 2);
        assert_eq!(stub.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_gitlab_unknown_owner() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(&format!("{}/users", GL), 200, json!([]))
            .on_get(&format!("{}/groups", GL), 200, json!([]));

        let output = parse(&gitlab_adapter(&stub).list_projects(Some("ghost"), None).await);
        assert_eq!(output, json!({"error": "User or group 'ghost' not found"}));
    }

    #[tokio::test]
    async fn test_gitlab_lists_all_projects_without_owner() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(&format!("{}/projects", GL), 200, json!([gitlab_project(5, "a/b")]));

        let output = parse(&gitlab_adapter(&stub).list_projects(None, None).await);
        assert_eq!(output.as_array().unwrap().len(), 1);
        assert_eq!(stub.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_gitlab_issues_and_merge_requests() {
        let stub = Arc::new(StubHttpClient::new());
        let mut mr = gitlab_issue(8);
        mr["source_branch"] = json!("feature");
        mr["target_branch"] = json!("main");
        let mut linked = gitlab_issue(2);
        linked["pull_request"] = json!({});
        stub.on_get(
            &format!("{}/projects/group%2Fproject/issues", GL),
            200,
            json!([gitlab_issue(1), linked]),
        )
        .on_get(
            &format!("{}/projects/group%2Fproject/merge_requests", GL),
            200,
            json!([mr]),
        );
        let adapter = gitlab_adapter(&stub);

        let issues = parse(&adapter.list_issues("group/project", "opened", None).await);
        assert_eq!(issues.as_array().unwrap().len(), 2);
        assert_eq!(issues[1]["iid"], 2);
        assert_eq!(issues[0]["author"], "alice");
        assert_eq!(issues[0]["assignees"], json!(["bob"]));
        assert_eq!(stub.requests()[0].query_value("order_by"), Some("updated_at"));

        let merge_requests = parse(&adapter.list_merge_requests("group/project", "opened", None).await);
        assert_eq!(merge_requests[0]["source_branch"], "feature");
        assert_eq!(merge_requests[0]["target_branch"], "main");
        assert_eq!(merge_requests[0]["user_notes_count"], 4);
    }

    #[tokio::test]
    async fn test_gitlab_get_file_with_fallback() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get_with(
            &format!("{}/projects/group%2Fproject/repository/files/docs%2Fguide.md", GL),
            &[("ref", "master")],
            200,
            json!({
                "size": 6,
                "encoding": "base64",
                "content": BASE64.encode("guide\n"),
                "last_commit_id": "deadbeef"
            }),
        )
        .on_get(
            &format!("{}/projects/group%2Fproject", GL),
            200,
            json!({"default_branch": "master"}),
        );

        let output = parse(&gitlab_adapter(&stub).get_file("group/project", "docs/guide.md", "main").await);
        assert_eq!(output["project"], "group/project");
        assert_eq!(output["branch"], "master");
        assert_eq!(output["content"], "guide\n");
        assert_eq!(output["last_commit_id"], "deadbeef");
        assert_eq!(stub.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_gitlab_get_file_missing_on_default_branch_too() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(
            &format!("{}/projects/group%2Fproject", GL),
            200,
            json!({"default_branch": "master"}),
        );

        let output = parse(&gitlab_adapter(&stub).get_file("group/project", "gone.md", "main").await);
        assert_eq!(output["branch"], "master");
        assert_eq!(
            output["error"],
            "File 'gone.md' not found in project group/project on branch master"
        );

        let requests = stub.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].query_value("ref"), Some("main"));
        assert_eq!(requests[2].query_value("ref"), Some("master"));
    }

    #[tokio::test]
    async fn test_gitlab_get_file_empty_project_not_retried() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(
            &format!("{}/projects/group%2Fproject", GL),
            200,
            json!({"id": 3, "default_branch": null}),
        );

        let output = parse(&gitlab_adapter(&stub).get_file("group/project", "README.md", "main").await);
        assert_eq!(output["branch"], "main");
        assert!(output["error"].as_str().unwrap().contains("on branch main"));
        assert_eq!(stub.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_gitlab_get_file_binary_content() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(
            &format!("{}/projects/42/repository/files/icon.ico", GL),
            200,
            json!({
                "size": 3,
                "content": BASE64.encode([0xff, 0xfe, 0x00]),
                "last_commit_id": "cafe"
            }),
        );

        let output = parse(&gitlab_adapter(&stub).get_file("42", "icon.ico", "main").await);
        assert_eq!(
            output["error"],
            "File appears to be binary and cannot be displayed as text"
        );
        assert_eq!(output["file_info"]["encoding"], "base64");
        assert_eq!(output["file_info"]["size"], 3);
        assert!(output.get("content").is_none());
        assert_eq!(stub.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_gitlab_get_file_missing() {
        let stub = Arc::new(StubHttpClient::new());

        let output = parse(&gitlab_adapter(&stub).get_file("42", "nope.txt", "develop").await);
        assert_eq!(
            output["error"],
            "File 'nope.txt' not found in project 42 on branch develop"
        );
        assert!(output["suggestion"]
            .as_str()
            .unwrap()
            .contains("list_repository_tree"));
    }

    #[tokio::test]
    async fn test_gitlab_tree_sorted() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(
            &format!("{}/projects/42/repository/tree", GL),
            200,
            json!([
                {"name": "main.rs", "type": "blob", "path": "src/main.rs", "mode": "100644"},
                {"name": "bin", "type": "tree", "path": "src/bin", "mode": "040000"},
                {"name": "Lib.rs", "type": "blob", "path": "src/Lib.rs", "mode": "100644"}
            ]),
        );

        let output = parse(&gitlab_adapter(&stub).list_repository_tree("42", "src", "main").await);
        let names: Vec<&str> = output["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["bin", "Lib.rs", "main.rs"]);
        assert_eq!(output["total_items"], 3);

        let request = &stub.requests()[0];
        assert_eq!(request.query_value("path"), Some("src"));
        assert_eq!(request.query_value("per_page"), Some("100"));
    }

    #[tokio::test]
    async fn test_gitlab_tree_root_omits_path() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(&format!("{}/projects/42/repository/tree", GL), 200, json!([]));

        let output = parse(&gitlab_adapter(&stub).list_repository_tree("42", "", "main").await);
        assert_eq!(output["path"], "/");
        assert_eq!(output["total_items"], 0);
        assert_eq!(stub.requests()[0].query_value("path"), None);
    }

    #[tokio::test]
    async fn test_gitlab_search_and_create() {
        let stub = Arc::new(StubHttpClient::new());
        stub.on_get(
            &format!("{}/projects", GL),
            200,
            json!([gitlab_project(1, "a/x"), gitlab_project(2, "b/x")]),
        )
        .on_post(&format!("{}/projects/7/issues", GL), 201, gitlab_issue(3));
        let adapter = gitlab_adapter(&stub);

        let search = parse(&adapter.search_projects("x", "last_activity_at", "desc", None).await);
        assert_eq!(search["total_results"], 2);
        assert_eq!(search["projects"][1]["path_with_namespace"], "b/x");

        let request = gitlab::NewIssue {
            title: "t".to_string(),
            description: String::new(),
            labels: vec!["a".to_string(), "b".to_string()],
            assignee_ids: vec![11],
        };
        let created = parse(&adapter.create_issue("7", &request).await);
        assert_eq!(created["iid"], 3);

        let sent = stub.requests()[1].body.clone().unwrap();
        assert_eq!(sent["labels"], "a,b");
        assert_eq!(sent["assignee_ids"], json!([11]));
    }

    #[tokio::test]
    async fn test_gitlab_plain_errors() {
        let stub = Arc::new(StubHttpClient::new());
        let adapter = gitlab_adapter(&stub);

        assert_eq!(
            adapter.get_issue("42", 1).await,
            "Error fetching issue: HTTP 404: Not Found"
        );
        assert!(adapter
            .get_project_info("42")
            .await
            .starts_with("Error fetching project info:"));
    }
}
