//! Removal of a previous AI review before a new review cycle posts.
//!
//! Flat review comments written by the reviewer are deleted. Inline review
//! threads it started are resolved instead, so human replies in those
//! threads survive. Both passes are idempotent: a second run against an
//! unchanged pull request finds nothing to do.

use std::fmt;

use anyhow::{Context, Result};
use futures::{StreamExt, stream};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    identity::AuthorIdentity,
    types::{Forge, PullRequestRef},
};

pub const DEFAULT_MAX_CONCURRENT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Upper bound on delete/resolve requests in flight at once.
    pub max_concurrent: usize,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// The artifact a cleanup mutation acted on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CleanupTarget {
    Comment(u64),
    Thread(String),
}

impl fmt::Display for CleanupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupTarget::Comment(id) => write!(f, "comment {id}"),
            CleanupTarget::Thread(id) => write!(f, "thread {id}"),
        }
    }
}

/// A single delete or resolve request that did not succeed.
#[derive(Debug)]
pub struct CleanupFailure {
    pub target: CleanupTarget,
    pub error: anyhow::Error,
}

impl fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.target, self.error)
    }
}

/// Per-item outcomes of one batch of mutations, ordered by target.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<CleanupTarget>,
    pub failures: Vec<CleanupFailure>,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<(CleanupTarget, Result<()>)>) -> Self {
        let mut report = BatchReport::default();
        for (target, outcome) in outcomes {
            match outcome {
                Ok(()) => report.succeeded.push(target),
                Err(error) => {
                    warn!(%target, error = %format!("{error:#}"), "Cleanup request failed");
                    report.failures.push(CleanupFailure { target, error });
                }
            }
        }
        report.succeeded.sort();
        report.failures.sort_by(|a, b| a.target.cmp(&b.target));
        report
    }

    pub fn count(&self) -> usize {
        self.succeeded.len()
    }
}

/// The serialisable part of a [`CleanupSummary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummaryRecord {
    pub comments_deleted: usize,
    pub threads_resolved: usize,
}

/// Outcome of a full cleanup run. Counts only include requests that
/// succeeded.
#[derive(Debug, Default)]
pub struct CleanupSummary {
    pub comments_deleted: usize,
    pub threads_resolved: usize,
    pub failures: Vec<CleanupFailure>,
}

impl CleanupSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn record(&self) -> SummaryRecord {
        SummaryRecord {
            comments_deleted: self.comments_deleted,
            threads_resolved: self.threads_resolved,
        }
    }
}

impl fmt::Display for CleanupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cleanup complete: {} comments deleted, {} threads resolved",
            self.comments_deleted, self.threads_resolved
        )
    }
}

/// Deletes every flat comment on `pr` that `identity` attributes to the
/// reviewer.
///
/// Failing to list comments aborts; a failed delete is recorded and the
/// remaining deletes still run.
pub async fn sweep_comments<F>(
    forge: &F,
    pr: &PullRequestRef,
    identity: &dyn AuthorIdentity,
    options: &CleanupOptions,
) -> Result<BatchReport>
where
    F: Forge + Sync + ?Sized,
{
    let comments = forge
        .list_issue_comments(pr)
        .await
        .with_context(|| format!("Failed to list comments on {pr}"))?;

    let targets: Vec<u64> = comments
        .iter()
        .filter(|comment| identity.matches_comment(comment))
        .map(|comment| comment.id)
        .collect();

    debug!(
        pr = %pr,
        total = comments.len(),
        matched = targets.len(),
        "Selected review comments for deletion"
    );

    let repo = &pr.repo;
    let outcomes = stream::iter(targets)
        .map(move |id| async move {
            let outcome = forge
                .delete_issue_comment(repo, id)
                .await
                .with_context(|| format!("Failed to delete comment {id} on {repo}"));
            (CleanupTarget::Comment(id), outcome)
        })
        .buffer_unordered(options.max_concurrent.max(1))
        .collect::<Vec<_>>()
        .await;

    Ok(BatchReport::from_outcomes(outcomes))
}

/// Resolves every unresolved inline thread on `pr` whose opening comment
/// `identity` attributes to the reviewer. Threads are never deleted.
///
/// Failing to fetch threads aborts; a failed resolve is recorded and the
/// remaining resolves still run.
pub async fn resolve_threads<F>(
    forge: &F,
    pr: &PullRequestRef,
    identity: &dyn AuthorIdentity,
    options: &CleanupOptions,
) -> Result<BatchReport>
where
    F: Forge + Sync + ?Sized,
{
    let threads = forge
        .fetch_review_threads(pr)
        .await
        .with_context(|| format!("Failed to fetch review threads on {pr}"))?;

    let targets: Vec<String> = threads
        .into_iter()
        .filter(|thread| !thread.is_resolved && identity.matches_thread(thread))
        .map(|thread| thread.id)
        .collect();

    debug!(pr = %pr, matched = targets.len(), "Selected review threads to resolve");

    let outcomes = stream::iter(targets)
        .map(move |id| async move {
            let outcome = match forge.resolve_review_thread(&id).await {
                Ok(true) => Ok(()),
                Ok(false) => Err(anyhow::anyhow!("GitHub reports thread {id} still unresolved")),
                Err(e) => Err(e.context(format!("Failed to resolve thread {id}"))),
            };
            (CleanupTarget::Thread(id), outcome)
        })
        .buffer_unordered(options.max_concurrent.max(1))
        .collect::<Vec<_>>()
        .await;

    Ok(BatchReport::from_outcomes(outcomes))
}

/// Clears the previous AI review from `pr`: deletes its flat comments, then
/// resolves the inline threads it opened.
pub async fn cleanup_previous_reviews<F>(
    forge: &F,
    pr: &PullRequestRef,
    identity: &dyn AuthorIdentity,
    options: &CleanupOptions,
) -> Result<CleanupSummary>
where
    F: Forge + Sync + ?Sized,
{
    let comments = sweep_comments(forge, pr, identity, options).await?;
    let threads = resolve_threads(forge, pr, identity, options).await?;

    let summary = CleanupSummary {
        comments_deleted: comments.count(),
        threads_resolved: threads.count(),
        failures: comments
            .failures
            .into_iter()
            .chain(threads.failures)
            .collect(),
    };

    info!(
        pr = %pr,
        comments_deleted = summary.comments_deleted,
        threads_resolved = summary.threads_resolved,
        failed = summary.failures.len(),
        "{summary}"
    );

    Ok(summary)
}
