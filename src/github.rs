use std::process::Command;

use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::{Octocrab, Page, models::CommentId};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, warn};

use crate::types::{Forge, IssueComment, PullRequestRef, Repo, ReviewThread, ThreadComment};

/// Review threads are fetched 100 at a time; stop after this many pages.
const MAX_THREAD_PAGES: usize = 20;

const REVIEW_THREADS_QUERY: &str = r#"
    query($owner: String!, $repo: String!, $pr: Int!, $after: String) {
        repository(owner: $owner, name: $repo) {
            pullRequest(number: $pr) {
                reviewThreads(first: 100, after: $after) {
                    nodes {
                        id
                        isResolved
                        comments(first: 1) {
                            nodes {
                                body
                                author {
                                    __typename
                                    login
                                }
                            }
                        }
                    }
                    pageInfo {
                        hasNextPage
                        endCursor
                    }
                }
            }
        }
    }
"#;

const RESOLVE_THREAD_MUTATION: &str = r#"
    mutation($threadId: ID!) {
        resolveReviewThread(input: {threadId: $threadId}) {
            thread {
                isResolved
            }
        }
    }
"#;

/// Looks up a token from `GITHUB_TOKEN`, then `GH_TOKEN`, then the gh CLI.
pub fn get_github_token() -> Result<String> {
    for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
        if let Ok(token) = std::env::var(var)
            && !token.trim().is_empty()
        {
            return Ok(token);
        }
    }

    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .context("No GITHUB_TOKEN or GH_TOKEN set and the gh CLI could not be run")?;

    if !output.status.success() {
        anyhow::bail!("Failed to get GitHub token from gh CLI. Please run 'gh auth login' first");
    }

    let token = String::from_utf8(output.stdout)?.trim().to_string();

    if token.is_empty() {
        anyhow::bail!("Empty token returned from gh CLI");
    }

    Ok(token)
}

/// [`Forge`] backed by the GitHub REST and GraphQL APIs.
#[derive(Debug, Clone)]
pub struct GitHub {
    client: Octocrab,
}

impl GitHub {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Authenticates with `token` against `api_url`, or github.com when
    /// `api_url` is `None`.
    pub fn connect(token: String, api_url: Option<&str>) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token);
        if let Some(url) = api_url {
            builder = builder
                .base_uri(url)
                .with_context(|| format!("Invalid GitHub API URL: '{url}'"))?;
        }
        let client = builder.build().context("Failed to create GitHub client")?;
        Ok(Self::new(client))
    }

    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: serde_json::Value) -> Result<T> {
        let payload = json!({ "query": query, "variables": variables });
        let response: GraphQLResponse<T> = self.client.graphql(&payload).await?;

        if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            anyhow::bail!("GraphQL errors: {}", messages.join("; "));
        }

        response.data.context("GraphQL response contained no data")
    }
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ThreadsData {
    repository: Option<ThreadsRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadsRepository {
    pull_request: Option<ThreadsPullRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadsPullRequest {
    review_threads: ThreadConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadConnection {
    nodes: Vec<ThreadNode>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadNode {
    id: String,
    is_resolved: bool,
    comments: ThreadCommentConnection,
}

#[derive(Debug, Deserialize)]
struct ThreadCommentConnection {
    nodes: Vec<ThreadComment>,
}

impl From<ThreadNode> for ReviewThread {
    fn from(node: ThreadNode) -> Self {
        ReviewThread {
            id: node.id,
            is_resolved: node.is_resolved,
            comments: node.comments.nodes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolveData {
    resolve_review_thread: ResolvePayload,
}

#[derive(Debug, Deserialize)]
struct ResolvePayload {
    thread: ResolvedThread,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolvedThread {
    is_resolved: bool,
}

#[async_trait]
impl Forge for GitHub {
    async fn list_issue_comments(&self, pr: &PullRequestRef) -> Result<Vec<IssueComment>> {
        let route = format!(
            "/repos/{}/{}/issues/{}/comments",
            pr.repo.owner(),
            pr.repo.name(),
            pr.number
        );
        let first: Page<IssueComment> = self
            .client
            .get(&route, Some(&[("per_page", "100")]))
            .await?;
        let comments = self.client.all_pages(first).await?;
        debug!(pr = %pr, count = comments.len(), "Listed issue comments");
        Ok(comments)
    }

    async fn delete_issue_comment(&self, repo: &Repo, comment_id: u64) -> Result<()> {
        self.client
            .issues(repo.owner(), repo.name())
            .delete_comment(CommentId(comment_id))
            .await?;
        debug!(repo = %repo, comment_id, "Deleted issue comment");
        Ok(())
    }

    async fn create_issue_comment(&self, pr: &PullRequestRef, body: &str) -> Result<u64> {
        let route = format!(
            "/repos/{}/{}/issues/{}/comments",
            pr.repo.owner(),
            pr.repo.name(),
            pr.number
        );
        let comment: IssueComment = self.client.post(route, Some(&json!({ "body": body }))).await?;
        Ok(comment.id)
    }

    async fn update_issue_comment(&self, repo: &Repo, comment_id: u64, body: &str) -> Result<()> {
        let route = format!(
            "/repos/{}/{}/issues/comments/{}",
            repo.owner(),
            repo.name(),
            comment_id
        );
        let _: IssueComment = self.client.patch(route, Some(&json!({ "body": body }))).await?;
        Ok(())
    }

    async fn fetch_review_threads(&self, pr: &PullRequestRef) -> Result<Vec<ReviewThread>> {
        let mut threads = Vec::new();
        let mut after: Option<String> = None;

        for page in 1..=MAX_THREAD_PAGES {
            let data: ThreadsData = self
                .graphql(
                    REVIEW_THREADS_QUERY,
                    json!({
                        "owner": pr.repo.owner(),
                        "repo": pr.repo.name(),
                        "pr": pr.number,
                        "after": after,
                    }),
                )
                .await?;

            let connection = data
                .repository
                .and_then(|r| r.pull_request)
                .with_context(|| format!("Pull request {pr} not found"))?
                .review_threads;

            threads.extend(connection.nodes.into_iter().map(ReviewThread::from));

            match connection.page_info {
                PageInfo {
                    has_next_page: true,
                    end_cursor: Some(cursor),
                } => after = Some(cursor),
                _ => return Ok(threads),
            }

            if page == MAX_THREAD_PAGES {
                warn!(
                    pr = %pr,
                    fetched = threads.len(),
                    "Stopped fetching review threads at page limit"
                );
            }
        }

        Ok(threads)
    }

    async fn resolve_review_thread(&self, thread_id: &str) -> Result<bool> {
        let data: ResolveData = self
            .graphql(RESOLVE_THREAD_MUTATION, json!({ "threadId": thread_id }))
            .await?;
        debug!(thread_id, "Resolved review thread");
        Ok(data.resolve_review_thread.thread.is_resolved)
    }
}
