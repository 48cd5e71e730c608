//! Conventional Commit checks for pull request titles.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

use crate::types::{Forge, PullRequestRef};

/// Identifies the reminder comment so reruns can find it again.
pub const REMINDER_MARKER: &str = "<!-- cc-title-bot -->";

/// Release PRs are titled exactly this and are exempt from the rule.
const DEPLOY_TITLE: &str = "Deploy";

static CONVENTIONAL_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(fix|feat|build|chore|ci|docs|style|refactor|perf|test|revert)(?:\(.+\))?!?:.+$")
        .expect("conventional commit pattern is valid")
});

pub fn is_conventional_title(title: &str) -> bool {
    title == DEPLOY_TITLE || CONVENTIONAL_TITLE.is_match(title)
}

pub fn reminder_body() -> String {
    format!(
        "{REMINDER_MARKER}
Hi there! :wave:
We use **Conventional Commit formatting** for PR titles, but your PR title does not appear to follow this.
Please update your title to follow [Conventional Commits](https://www.conventionalcommits.org) guidelines.
"
    )
}

/// What happened to the reminder comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderAction {
    Posted,
    AlreadyPresent,
    Removed,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleOutcome {
    pub valid: bool,
    pub reminder: ReminderAction,
}

/// Checks `title` and keeps the reminder comment on `pr` in sync: one
/// reminder while the title is invalid, none once it is fixed.
pub async fn lint_title<F>(forge: &F, pr: &PullRequestRef, title: &str) -> Result<TitleOutcome>
where
    F: Forge + Sync + ?Sized,
{
    let comments = forge
        .list_issue_comments(pr)
        .await
        .with_context(|| format!("Failed to list comments on {pr}"))?;
    let existing = comments.iter().find(|comment| {
        comment
            .body
            .as_deref()
            .is_some_and(|body| body.contains(REMINDER_MARKER))
    });

    let valid = is_conventional_title(title);

    let reminder = match (valid, existing) {
        (false, None) => {
            forge
                .create_issue_comment(pr, &reminder_body())
                .await
                .with_context(|| format!("Failed to post title reminder on {pr}"))?;
            ReminderAction::Posted
        }
        (false, Some(_)) => {
            info!("PR title is invalid but reminder has already been posted; skipping reminder.");
            ReminderAction::AlreadyPresent
        }
        (true, Some(comment)) => {
            forge
                .delete_issue_comment(&pr.repo, comment.id)
                .await
                .with_context(|| format!("Failed to delete title reminder {}", comment.id))?;
            info!("Conventional commit check passed, deleted existing comments.");
            ReminderAction::Removed
        }
        (true, None) => ReminderAction::None,
    };

    if valid {
        info!(title, "PR title is valid.");
    }

    Ok(TitleOutcome { valid, reminder })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_conventional_titles() {
        for title in [
            "feat: add search",
            "fix(api): handle empty body",
            "refactor!: drop legacy config",
            "chore(deps)!: bump everything",
            "Deploy",
        ] {
            assert!(is_conventional_title(title), "{title}");
        }
    }

    #[test]
    fn rejects_other_titles() {
        for title in [
            "Add search",
            "feat add search",
            "feat:",
            "feature: add search",
            "Feat: add search",
            "deploy",
            "Deploy to production",
        ] {
            assert!(!is_conventional_title(title), "{title}");
        }
    }

    #[test]
    fn reminder_starts_with_marker() {
        assert!(reminder_body().starts_with(REMINDER_MARKER));
    }
}
