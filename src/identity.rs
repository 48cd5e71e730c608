//! Recognising comments and threads written by the automated reviewer.
//!
//! Cleanup is destructive, so every matcher fails closed: a missing author,
//! a missing body, or any field that differs from the configured identity is
//! a non-match.

use std::fmt::Debug;

use clap::ValueEnum;

use crate::types::{IssueComment, ReviewThread, ThreadComment};

pub const DEFAULT_BOT_LOGIN: &str = "claude";
pub const DEFAULT_MAIN_MARKER: &str = "<!-- claude-ai-review-main -->";
pub const DEFAULT_INLINE_MARKER: &str = "<!-- claude-ai-review-inline -->";

const BOT_TYPE: &str = "Bot";

/// Decides whether an artifact on a pull request belongs to the reviewer.
pub trait AuthorIdentity: Debug + Send + Sync {
    /// Flat REST issue comment.
    fn matches_comment(&self, comment: &IssueComment) -> bool;

    /// Single GraphQL comment inside a review thread.
    fn matches_thread_comment(&self, comment: &ThreadComment) -> bool;

    /// A thread belongs to whoever wrote its opening comment.
    fn matches_thread(&self, thread: &ReviewThread) -> bool {
        thread
            .opening_comment()
            .is_some_and(|comment| self.matches_thread_comment(comment))
    }
}

/// Matches on the author record of a GitHub App bot account.
///
/// The same account appears as `claude[bot]` with `type: "Bot"` over REST,
/// and as `claude` with `__typename: "Bot"` over GraphQL. Configure it with
/// the bare login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotAccount {
    login: String,
    rest_login: String,
}

impl BotAccount {
    /// Accepts the bare login or the REST form with one `[bot]` suffix.
    pub fn new(login: &str) -> anyhow::Result<Self> {
        let login = login.strip_suffix("[bot]").unwrap_or(login);
        if login.trim().is_empty() {
            anyhow::bail!("Bot login must be non-empty");
        }
        Ok(Self::from_login(login))
    }

    fn from_login(login: &str) -> Self {
        Self {
            login: login.to_string(),
            rest_login: format!("{login}[bot]"),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }
}

impl Default for BotAccount {
    fn default() -> Self {
        Self::from_login(DEFAULT_BOT_LOGIN)
    }
}

impl AuthorIdentity for BotAccount {
    fn matches_comment(&self, comment: &IssueComment) -> bool {
        comment
            .user
            .as_ref()
            .is_some_and(|user| {
                user.kind.as_deref() == Some(BOT_TYPE)
                    && user.login.as_deref() == Some(self.rest_login.as_str())
            })
    }

    fn matches_thread_comment(&self, comment: &ThreadComment) -> bool {
        comment
            .author
            .as_ref()
            .is_some_and(|author| {
                author.typename.as_deref() == Some(BOT_TYPE)
                    && author.login.as_deref() == Some(self.login.as_str())
            })
    }
}

/// Matches on a literal marker the reviewer embeds in every comment body,
/// ignoring the author field entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyMarker {
    main: String,
    inline: String,
}

impl BodyMarker {
    /// Empty markers would match every comment, so they are rejected.
    pub fn new(main: impl Into<String>, inline: impl Into<String>) -> anyhow::Result<Self> {
        let main = main.into();
        let inline = inline.into();
        if main.trim().is_empty() || inline.trim().is_empty() {
            anyhow::bail!("Review markers must be non-empty");
        }
        Ok(Self { main, inline })
    }
}

impl Default for BodyMarker {
    fn default() -> Self {
        Self {
            main: DEFAULT_MAIN_MARKER.to_string(),
            inline: DEFAULT_INLINE_MARKER.to_string(),
        }
    }
}

impl AuthorIdentity for BodyMarker {
    fn matches_comment(&self, comment: &IssueComment) -> bool {
        comment
            .body
            .as_deref()
            .is_some_and(|body| body.contains(&self.main))
    }

    fn matches_thread_comment(&self, comment: &ThreadComment) -> bool {
        comment
            .body
            .as_deref()
            .is_some_and(|body| body.contains(&self.inline))
    }
}

/// How reviewer-owned comments are recognised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MatchStrategy {
    /// Trust the author record (bot type and login).
    #[default]
    Author,
    /// Trust a marker embedded in the comment body.
    Marker,
}

/// Settings an [`AuthorIdentity`] is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub strategy: MatchStrategy,
    pub bot_login: String,
    pub main_marker: String,
    pub inline_marker: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::Author,
            bot_login: DEFAULT_BOT_LOGIN.to_string(),
            main_marker: DEFAULT_MAIN_MARKER.to_string(),
            inline_marker: DEFAULT_INLINE_MARKER.to_string(),
        }
    }
}

impl IdentityConfig {
    pub fn build(&self) -> anyhow::Result<Box<dyn AuthorIdentity>> {
        match self.strategy {
            MatchStrategy::Author => Ok(Box::new(BotAccount::new(self.bot_login.trim())?)),
            MatchStrategy::Marker => Ok(Box::new(BodyMarker::new(
                self.main_marker.clone(),
                self.inline_marker.clone(),
            )?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GraphQLAuthor, RestUser};

    fn rest(login: &str, kind: &str) -> IssueComment {
        IssueComment {
            id: 1,
            user: Some(RestUser::new(login, kind)),
            body: Some("review".into()),
        }
    }

    fn graphql(login: &str, typename: &str, body: &str) -> ThreadComment {
        ThreadComment {
            author: Some(GraphQLAuthor::new(login, typename)),
            body: Some(body.into()),
        }
    }

    #[test]
    fn bot_account_matches_rest_shape() {
        let bot = BotAccount::default();
        assert!(bot.matches_comment(&rest("claude[bot]", "Bot")));
        assert!(!bot.matches_comment(&rest("claude", "Bot")));
        assert!(!bot.matches_comment(&rest("claude[bot]", "User")));
        assert!(!bot.matches_comment(&rest("other[bot]", "Bot")));
    }

    #[test]
    fn bot_account_matches_graphql_shape() {
        let bot = BotAccount::default();
        assert!(bot.matches_thread_comment(&graphql("claude", "Bot", "x")));
        assert!(!bot.matches_thread_comment(&graphql("claude[bot]", "Bot", "x")));
        assert!(!bot.matches_thread_comment(&graphql("claude", "User", "x")));
    }

    #[test]
    fn bot_account_fails_closed_without_author() {
        let bot = BotAccount::default();
        let comment = IssueComment {
            id: 1,
            user: None,
            body: Some(DEFAULT_MAIN_MARKER.into()),
        };
        assert!(!bot.matches_comment(&comment));
        assert!(!bot.matches_thread_comment(&ThreadComment {
            author: None,
            body: None
        }));
    }

    #[test]
    fn bot_account_accepts_suffixed_login() {
        let bot = BotAccount::new("claude[bot]").unwrap();
        assert_eq!(bot.login(), "claude");
        assert!(bot.matches_comment(&rest("claude[bot]", "Bot")));
    }

    #[test]
    fn bot_account_strips_a_single_suffix() {
        let bot = BotAccount::new("x[bot][bot]").unwrap();
        assert_eq!(bot.login(), "x[bot]");
        assert!(bot.matches_comment(&rest("x[bot][bot]", "Bot")));
        assert!(!bot.matches_comment(&rest("x[bot]", "Bot")));
    }

    #[test]
    fn bot_account_rejects_blank_login() {
        assert!(BotAccount::new("").is_err());
        assert!(BotAccount::new("[bot]").is_err());
        assert!(BotAccount::new("  ").is_err());
    }

    #[test]
    fn bot_account_fails_closed_on_partial_author() {
        let bot = BotAccount::default();
        let comment = IssueComment {
            id: 1,
            user: Some(RestUser {
                login: Some("claude[bot]".into()),
                kind: None,
            }),
            body: None,
        };
        assert!(!bot.matches_comment(&comment));

        let comment = ThreadComment {
            author: Some(GraphQLAuthor {
                login: None,
                typename: Some("Bot".into()),
            }),
            body: None,
        };
        assert!(!bot.matches_thread_comment(&comment));
    }

    #[test]
    fn body_marker_ignores_author() {
        let marker = BodyMarker::default();
        let mut comment = rest("someone", "User");
        comment.body = Some(format!("{DEFAULT_MAIN_MARKER}\n## Code Review"));
        assert!(marker.matches_comment(&comment));

        comment.body = Some("Regular comment without marker".into());
        assert!(!marker.matches_comment(&comment));

        comment.body = None;
        assert!(!marker.matches_comment(&comment));
    }

    #[test]
    fn body_marker_keeps_main_and_inline_apart() {
        let marker = BodyMarker::default();
        assert!(marker.matches_thread_comment(&graphql("x", "User", DEFAULT_INLINE_MARKER)));
        assert!(!marker.matches_thread_comment(&graphql("x", "User", DEFAULT_MAIN_MARKER)));
    }

    #[test]
    fn thread_identity_comes_from_opening_comment() {
        let bot = BotAccount::default();
        let human_then_bot = ReviewThread {
            id: "T".into(),
            is_resolved: false,
            comments: vec![graphql("alice", "User", "q"), graphql("claude", "Bot", "a")],
        };
        assert!(!bot.matches_thread(&human_then_bot));

        let empty = ReviewThread {
            id: "E".into(),
            is_resolved: false,
            comments: vec![],
        };
        assert!(!bot.matches_thread(&empty));
    }

    #[test]
    fn config_rejects_blank_identities() {
        let config = IdentityConfig {
            bot_login: "  ".into(),
            ..IdentityConfig::default()
        };
        assert!(config.build().is_err());

        let config = IdentityConfig {
            strategy: MatchStrategy::Marker,
            main_marker: String::new(),
            ..IdentityConfig::default()
        };
        assert!(config.build().is_err());
    }
}
