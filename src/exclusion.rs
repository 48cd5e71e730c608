//! Decides whether a pull request should skip AI review based on its title.

use regex::RegexBuilder;
use serde::Serialize;
use tracing::warn;

use crate::config::ExcludeConfig;

/// Release and generated-schema PRs are skipped unless a repository opts
/// out with `disable_defaults`.
pub const DEFAULT_TITLE_PATTERNS: [&str; 2] = ["^Deploy$", "graphql schema"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    pub excluded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Exclusion {
    fn included() -> Self {
        Self {
            excluded: false,
            reason: None,
        }
    }

    fn excluded(reason: String) -> Self {
        Self {
            excluded: true,
            reason: Some(reason),
        }
    }
}

/// Case-insensitive match. Invalid patterns never match.
fn title_matches(pattern: &str, title: &str) -> bool {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => re.is_match(title),
        Err(e) => {
            warn!(pattern, error = %e, "Invalid regex pattern");
            false
        }
    }
}

pub fn check_title_exclusion(title: &str, config: Option<&ExcludeConfig>) -> Exclusion {
    let use_defaults = !config.is_some_and(|c| c.disable_defaults);

    if use_defaults
        && let Some(pattern) = DEFAULT_TITLE_PATTERNS
            .iter()
            .find(|pattern| title_matches(pattern, title))
    {
        return Exclusion::excluded(format!("Title matches default pattern: {pattern}"));
    }

    let custom = config.map(|c| c.title_patterns.as_slice()).unwrap_or_default();
    if let Some(pattern) = custom.iter().find(|pattern| title_matches(pattern, title)) {
        return Exclusion::excluded(format!("Title matches custom pattern: {pattern}"));
    }

    Exclusion::included()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(disable_defaults: bool, patterns: &[&str]) -> ExcludeConfig {
        ExcludeConfig {
            disable_defaults,
            title_patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn default_patterns_apply_without_config() {
        let result = check_title_exclusion("Deploy", None);
        assert_eq!(
            result,
            Exclusion::excluded("Title matches default pattern: ^Deploy$".into())
        );

        let result = check_title_exclusion("chore: Update GraphQL Schema", None);
        assert_eq!(
            result.reason.as_deref(),
            Some("Title matches default pattern: graphql schema")
        );
    }

    #[test]
    fn deploy_must_match_whole_title() {
        assert!(!check_title_exclusion("Deploy to staging", None).excluded);
        assert!(check_title_exclusion("deploy", None).excluded);
    }

    #[test]
    fn ordinary_titles_are_included() {
        assert_eq!(
            check_title_exclusion("feat: add artwork filters", None),
            Exclusion::included()
        );
    }

    #[test]
    fn custom_patterns_match_case_insensitively() {
        let cfg = config(false, &["eigen query map"]);
        let result = check_title_exclusion("chore: Update Eigen Query Map", Some(&cfg));
        assert_eq!(
            result.reason.as_deref(),
            Some("Title matches custom pattern: eigen query map")
        );
    }

    #[test]
    fn defaults_can_be_disabled() {
        let cfg = config(true, &["schema sync"]);
        assert!(!check_title_exclusion("Deploy", Some(&cfg)).excluded);
        assert!(check_title_exclusion("schema sync", Some(&cfg)).excluded);
    }

    #[test]
    fn defaults_take_precedence_over_custom() {
        let cfg = config(false, &["deploy"]);
        assert_eq!(
            check_title_exclusion("Deploy", Some(&cfg)).reason.as_deref(),
            Some("Title matches default pattern: ^Deploy$")
        );
    }

    #[test]
    fn invalid_patterns_are_skipped() {
        let cfg = config(false, &["[unclosed", "valid"]);
        assert_eq!(
            check_title_exclusion("a valid title", Some(&cfg))
                .reason
                .as_deref(),
            Some("Title matches custom pattern: valid")
        );
        assert!(!check_title_exclusion("[unclosed", Some(&cfg)).excluded);
    }

    #[test]
    fn serializes_for_step_outputs() {
        let json = serde_json::to_value(check_title_exclusion("feat: x", None)).unwrap();
        assert_eq!(json, serde_json::json!({"excluded": false}));
    }
}
