use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Reasons a repository identifier can be rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    MissingSeparator,
    EmptySegment,
    TooManySegments,
    InvalidUrl(String),
    NotGitHub(String),
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoError::MissingSeparator => write!(f, "expected 'owner/repo'"),
            RepoError::EmptySegment => write!(f, "owner and repository name must be non-empty"),
            RepoError::TooManySegments => write!(f, "expected exactly one '/'"),
            RepoError::InvalidUrl(url) => write!(f, "cannot parse URL '{url}'"),
            RepoError::NotGitHub(url) => write!(f, "'{url}' is not a github.com URL"),
        }
    }
}

impl std::error::Error for RepoError {}

/// A GitHub repository, `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Repo {
    owner: String,
    name: String,
}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, RepoError> {
        let owner = owner.into();
        let name = name.into();
        if owner.trim().is_empty() || name.trim().is_empty() {
            return Err(RepoError::EmptySegment);
        }
        Ok(Self { owner, name })
    }

    pub fn parse(s: &str) -> Result<Self, RepoError> {
        let mut parts = s.trim().split('/');
        let (Some(owner), Some(name)) = (parts.next(), parts.next()) else {
            return Err(RepoError::MissingSeparator);
        };
        if parts.next().is_some() {
            return Err(RepoError::TooManySegments);
        }
        Self::new(owner, name)
    }

    /// Parses `https://github.com/owner/repo[/pull/N]`, returning the PR
    /// number when the URL points at a pull request.
    pub fn parse_url(s: &str) -> Result<(Self, Option<u64>), RepoError> {
        let url = url::Url::parse(s).map_err(|_| RepoError::InvalidUrl(s.to_string()))?;
        if url.host_str() != Some("github.com") {
            return Err(RepoError::NotGitHub(s.to_string()));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [owner, name] => Ok((Self::new(*owner, *name)?, None)),
            [owner, name, "pull", number, ..] => {
                let number = number
                    .parse()
                    .map_err(|_| RepoError::InvalidUrl(s.to_string()))?;
                Ok((Self::new(*owner, *name)?, Some(number)))
            }
            _ => Err(RepoError::InvalidUrl(s.to_string())),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Identifies one pull request. Issue-comment endpoints accept the same
/// number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PullRequestRef {
    pub repo: Repo,
    pub number: u64,
}

impl PullRequestRef {
    pub fn new(repo: Repo, number: u64) -> Self {
        Self { repo, number }
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.number)
    }
}

/// The `user` object of a REST issue comment.
///
/// REST reports bot accounts with `type: "Bot"` and a login carrying a
/// `[bot]` suffix, e.g. `claude[bot]`. Either field may be absent in a
/// malformed record; such a user matches no identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RestUser {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl RestUser {
    pub fn new(login: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            login: Some(login.into()),
            kind: Some(kind.into()),
        }
    }
}

/// A flat (non-threaded) comment on a pull request, as returned by the REST
/// issue-comments endpoint.
///
/// `user` is `None` for deleted ("ghost") accounts or when the payload is
/// missing the field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub user: Option<RestUser>,
    #[serde(default)]
    pub body: Option<String>,
}

/// The `author` of a GraphQL comment.
///
/// GraphQL reports bot accounts with `__typename: "Bot"` and the bare login,
/// e.g. `claude`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GraphQLAuthor {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(rename = "__typename", default)]
    pub typename: Option<String>,
}

impl GraphQLAuthor {
    pub fn new(login: impl Into<String>, typename: impl Into<String>) -> Self {
        Self {
            login: Some(login.into()),
            typename: Some(typename.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThreadComment {
    #[serde(default)]
    pub author: Option<GraphQLAuthor>,
    #[serde(default)]
    pub body: Option<String>,
}

/// An inline review thread on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewThread {
    pub id: String,
    pub is_resolved: bool,
    pub comments: Vec<ThreadComment>,
}

impl ReviewThread {
    /// The comment that started the thread. Replies never change who
    /// started it.
    pub fn opening_comment(&self) -> Option<&ThreadComment> {
        self.comments.first()
    }
}

/// The GitHub operations the CI scripts depend on.
///
/// Listing operations return fully drained sequences: implementations
/// follow pagination themselves.
#[async_trait]
pub trait Forge {
    async fn list_issue_comments(&self, pr: &PullRequestRef) -> Result<Vec<IssueComment>>;

    async fn delete_issue_comment(&self, repo: &Repo, comment_id: u64) -> Result<()>;

    async fn create_issue_comment(&self, pr: &PullRequestRef, body: &str) -> Result<u64>;

    async fn update_issue_comment(&self, repo: &Repo, comment_id: u64, body: &str) -> Result<()>;

    async fn fetch_review_threads(&self, pr: &PullRequestRef) -> Result<Vec<ReviewThread>>;

    /// Marks a review thread resolved, returning the resolved flag GitHub
    /// reports afterwards.
    async fn resolve_review_thread(&self, thread_id: &str) -> Result<bool>;
}
