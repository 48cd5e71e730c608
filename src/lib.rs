//! prkit: pull request automation for CI pipelines.
//!
//! The centrepiece clears the previous AI review from a pull request before
//! a new one is posted: the reviewer's flat comments are deleted and the
//! inline threads it opened are resolved, keeping any human replies. Sibling
//! commands lint PR titles, report dependency audits, build the reviewer
//! prompt, and decide whether a PR should be reviewed at all.
//!
//! Everything that talks to GitHub goes through the [`Forge`] trait, so the
//! logic runs unchanged against [`GitHub`] or a test double.

pub mod actions;
pub mod audit;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod exclusion;
pub mod github;
pub mod identity;
pub mod prompt;
pub mod title;
pub mod types;

pub use cleanup::{
    BatchReport, CleanupFailure, CleanupOptions, CleanupSummary, CleanupTarget, SummaryRecord,
    cleanup_previous_reviews, resolve_threads, sweep_comments,
};
pub use cli::{Command, Connection, Invocation, parse_args};
pub use github::GitHub;
pub use identity::{AuthorIdentity, BodyMarker, BotAccount, IdentityConfig, MatchStrategy};
pub use types::{
    Forge, GraphQLAuthor, IssueComment, PullRequestRef, Repo, RepoError, RestUser, ReviewThread,
    ThreadComment,
};
