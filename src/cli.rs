use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::{
    actions::{EventPullRequest, read_event},
    audit::Severity,
    cleanup::{CleanupOptions, DEFAULT_MAX_CONCURRENT},
    config::DEFAULT_CONFIG_FILE,
    identity::{
        DEFAULT_BOT_LOGIN, DEFAULT_INLINE_MARKER, DEFAULT_MAIN_MARKER, IdentityConfig,
        MatchStrategy,
    },
    types::{PullRequestRef, Repo},
};

const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

/// Where the triggering pull request comes from.
#[derive(Args, Debug, Clone, Default)]
struct PullRequestArgs {
    /// Repository in format 'owner/repo'
    #[arg(short = 'r', long, env = "GITHUB_REPOSITORY", value_name = "OWNER/REPO")]
    repo: Option<String>,

    /// Pull request number or URL (defaults to the triggering event)
    #[arg(short = 'p', long = "pr", value_name = "PR-NUMBER|PR-URL")]
    pr: Option<String>,

    /// Webhook payload of the triggering event
    #[arg(long, env = "GITHUB_EVENT_PATH", value_name = "PATH", hide_env_values = true)]
    event_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct IdentityArgs {
    /// How to recognise the reviewer's comments
    #[arg(long = "match-by", env = "PRKIT_MATCH_BY", value_enum, default_value_t = MatchStrategy::Author)]
    strategy: MatchStrategy,

    /// Bot login without the '[bot]' suffix
    #[arg(long, env = "PRKIT_BOT_LOGIN", default_value = DEFAULT_BOT_LOGIN, value_name = "LOGIN")]
    bot_login: String,

    /// Marker identifying top-level review comments (--match-by marker)
    #[arg(long, default_value = DEFAULT_MAIN_MARKER, value_name = "TEXT")]
    main_marker: String,

    /// Marker identifying inline review comments (--match-by marker)
    #[arg(long, default_value = DEFAULT_INLINE_MARKER, value_name = "TEXT")]
    inline_marker: String,
}

#[derive(Args, Debug, Clone)]
struct CleanupArgs {
    #[command(flatten)]
    target: PullRequestArgs,

    #[command(flatten)]
    identity: IdentityArgs,

    /// Maximum delete/resolve requests in flight
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT, value_name = "NUM")]
    max_concurrent: usize,

    /// Succeed even when some comments or threads could not be cleaned up
    #[arg(long)]
    allow_partial: bool,
}

#[derive(Args, Debug, Clone)]
struct LintTitleArgs {
    #[command(flatten)]
    target: PullRequestArgs,

    /// Title to check (defaults to the triggering event's PR title)
    #[arg(short = 't', long, value_name = "TITLE")]
    title: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct AuditArgs {
    #[command(flatten)]
    target: PullRequestArgs,

    /// Lowest severity to report: low, moderate, high or critical
    #[arg(long, env = "SEVERITY_THRESHOLD", default_value = "critical", value_name = "LEVEL")]
    threshold: String,

    /// Newline-delimited JSON from `yarn audit --json`
    #[arg(short = 'f', long, default_value = "audit.json", value_name = "PATH")]
    file: PathBuf,

    /// Post or update the report as a pull request comment
    #[arg(long)]
    comment: bool,

    /// Exit with failure when advisories are found
    #[arg(long)]
    fail_on_findings: bool,
}

#[derive(Args, Debug, Clone)]
struct PromptArgs {
    /// Repository review configuration
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_FILE, value_name = "PATH")]
    config: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct CheckExclusionArgs {
    /// Title to check (defaults to the triggering event's PR title)
    #[arg(short = 't', long, value_name = "TITLE")]
    title: Option<String>,

    /// Webhook payload of the triggering event
    #[arg(long, env = "GITHUB_EVENT_PATH", value_name = "PATH", hide_env_values = true)]
    event_path: Option<PathBuf>,

    /// Repository review configuration
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_FILE, value_name = "PATH")]
    config: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
enum CommandArgs {
    /// Delete the previous AI review's comments and resolve its inline threads
    Cleanup(CleanupArgs),
    /// Require a Conventional Commit PR title, keeping one reminder comment
    LintTitle(LintTitleArgs),
    /// Report dependency advisories at or above a severity threshold
    Audit(AuditArgs),
    /// Build the AI review prompt from the repository configuration
    Prompt(PromptArgs),
    /// Decide whether a PR should skip AI review based on its title
    CheckExclusion(CheckExclusionArgs),
}

#[derive(Parser, Debug)]
#[command(name = "prkit", about = "Pull request automation for CI: review cleanup, title linting, audit reports")]
#[command(long_version = BUILD_INFO_HUMAN)]
struct CliArgs {
    /// GitHub token (falls back to GH_TOKEN, then `gh auth token`)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true, value_name = "TOKEN")]
    token: Option<String>,

    /// GitHub API base URL, for GitHub Enterprise Server
    #[arg(long, env = "GITHUB_API_URL", global = true, value_name = "URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: CommandArgs,
}

/// Credentials and endpoint for the GitHub API.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    pub token: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CleanupSpec {
    pub pr: PullRequestRef,
    pub identity: IdentityConfig,
    pub options: CleanupOptions,
    pub allow_partial: bool,
}

#[derive(Debug, Clone)]
pub struct TitleSpec {
    pub pr: PullRequestRef,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct AuditSpec {
    /// Set when the report should be posted as a comment.
    pub pr: Option<PullRequestRef>,
    pub threshold: Severity,
    pub file: PathBuf,
    pub fail_on_findings: bool,
}

#[derive(Debug, Clone)]
pub struct PromptSpec {
    pub config: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ExclusionSpec {
    pub title: String,
    pub config: PathBuf,
}

#[derive(Debug, Clone)]
pub enum Command {
    Cleanup(CleanupSpec),
    LintTitle(TitleSpec),
    Audit(AuditSpec),
    Prompt(PromptSpec),
    CheckExclusion(ExclusionSpec),
}

/// A fully validated command line.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub connection: Connection,
    pub command: Command,
}

fn event_pull_request(event_path: Option<&Path>) -> Result<EventPullRequest> {
    let path = event_path
        .context("No pull request given: pass --pr or run from a pull_request event")?;
    read_event(path)?
        .pull_request
        .with_context(|| format!("Event payload {} is not a pull request event", path.display()))
}

fn parse_repo(repo: &str) -> Result<Repo> {
    Repo::parse(repo).map_err(|e| anyhow::anyhow!("Invalid repository format '{}': {}", repo, e))
}

impl PullRequestArgs {
    fn resolve(&self) -> Result<PullRequestRef> {
        let repo = self.repo.as_deref().map(parse_repo).transpose()?;

        match self.pr.as_deref().map(str::trim) {
            Some(url) if url.starts_with("https://") => {
                let (url_repo, number) = Repo::parse_url(url)
                    .map_err(|e| anyhow::anyhow!("Invalid PR URL '{}': {}", url, e))?;
                let number = number
                    .ok_or_else(|| anyhow::anyhow!("URL must contain '/pull/' in the path"))?;
                if let Some(repo) = repo
                    && repo != url_repo
                {
                    anyhow::bail!("PR URL {} is from {} but --repo specifies {}", url, url_repo, repo);
                }
                Ok(PullRequestRef::new(url_repo, number))
            }
            Some(number) => {
                let number: u64 = number
                    .parse()
                    .with_context(|| format!("Invalid PR number: '{}'", number))?;
                let repo = repo.context("PR numbers require --repo (or GITHUB_REPOSITORY)")?;
                Ok(PullRequestRef::new(repo, number))
            }
            None => {
                let event = event_pull_request(self.event_path.as_deref())?;
                let repo = repo.context("--repo (or GITHUB_REPOSITORY) is required")?;
                Ok(PullRequestRef::new(repo, event.number))
            }
        }
    }
}

fn resolve_title(title: Option<String>, event_path: Option<&Path>) -> Result<String> {
    match title {
        Some(title) => Ok(title),
        None => Ok(event_pull_request(event_path)?.title),
    }
}

fn build_command(args: CommandArgs) -> Result<Command> {
    Ok(match args {
        CommandArgs::Cleanup(args) => {
            if args.max_concurrent == 0 {
                anyhow::bail!("--max-concurrent must be at least 1");
            }
            Command::Cleanup(CleanupSpec {
                pr: args.target.resolve()?,
                identity: IdentityConfig {
                    strategy: args.identity.strategy,
                    bot_login: args.identity.bot_login,
                    main_marker: args.identity.main_marker,
                    inline_marker: args.identity.inline_marker,
                },
                options: CleanupOptions {
                    max_concurrent: args.max_concurrent,
                },
                allow_partial: args.allow_partial,
            })
        }
        CommandArgs::LintTitle(args) => Command::LintTitle(TitleSpec {
            pr: args.target.resolve()?,
            title: resolve_title(args.title, args.target.event_path.as_deref())?,
        }),
        CommandArgs::Audit(args) => Command::Audit(AuditSpec {
            pr: if args.comment {
                Some(args.target.resolve()?)
            } else {
                None
            },
            threshold: args.threshold.parse()?,
            file: args.file,
            fail_on_findings: args.fail_on_findings,
        }),
        CommandArgs::Prompt(args) => Command::Prompt(PromptSpec {
            config: args.config,
        }),
        CommandArgs::CheckExclusion(args) => Command::CheckExclusion(ExclusionSpec {
            title: resolve_title(args.title, args.event_path.as_deref())?,
            config: args.config,
        }),
    })
}

/// Parses and validates command-line arguments.
///
/// Pull request targets are resolved here, reading the event payload when
/// no explicit PR is given, so later stages only see complete requests.
pub fn parse_args<I, T>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = CliArgs::try_parse_from(args)?;
    Ok(Invocation {
        connection: Connection {
            token: cli.token.filter(|t| !t.trim().is_empty()),
            api_url: cli.api_url.filter(|u| !u.trim().is_empty()),
        },
        command: build_command(cli.command)?,
    })
}
