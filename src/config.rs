//! Per-repository review configuration, read from `.claude-review.yml`.
//!
//! ```yaml
//! focus_areas:
//!   - "Watch for N+1 queries in database operations"
//! ignore_paths:
//!   - "**/*.generated.ts"
//! context: |
//!   This is a Ruby on Rails API using GraphQL.
//! exclude:
//!   disable_defaults: false
//!   title_patterns:
//!     - "schema sync"
//! ```
//!
//! A non-empty `prompt` replaces the generated prompt entirely.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = ".claude-review.yml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub prompt: Option<String>,
    pub focus_areas: Vec<String>,
    pub ignore_paths: Vec<String>,
    pub context: Option<String>,
    pub exclude: Option<ExcludeConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExcludeConfig {
    pub disable_defaults: bool,
    pub title_patterns: Vec<String>,
}

impl ReviewConfig {
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Invalid review configuration")
    }

    /// Returns `None` when the file is missing. A file that cannot be read
    /// or parsed is reported and also treated as missing.
    pub fn load(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        let loaded = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .and_then(|content| Self::parse(&content));

        match loaded {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "Ignoring review configuration");
                None
            }
        }
    }

    /// The custom prompt, if it has any content.
    pub fn custom_prompt(&self) -> Option<&str> {
        self.prompt.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = ReviewConfig::parse(
            r#"
focus_areas:
  - "Watch for N+1 queries"
  - 'Ensure new endpoints have authentication'
  - unquoted item
ignore_paths:
  - "**/*.generated.ts"
context: |
  This is a Ruby on Rails API.
  It uses GraphQL.
exclude:
  disable_defaults: true
  title_patterns:
    - "schema sync"
"#,
        )
        .unwrap();

        assert_eq!(
            config.focus_areas,
            [
                "Watch for N+1 queries",
                "Ensure new endpoints have authentication",
                "unquoted item"
            ]
        );
        assert_eq!(config.ignore_paths, ["**/*.generated.ts"]);
        assert_eq!(
            config.context.as_deref(),
            Some("This is a Ruby on Rails API.\nIt uses GraphQL.\n")
        );
        assert_eq!(
            config.exclude,
            Some(ExcludeConfig {
                disable_defaults: true,
                title_patterns: vec!["schema sync".into()],
            })
        );
        assert_eq!(config.custom_prompt(), None);
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(ReviewConfig::parse("").unwrap(), ReviewConfig::default());
        assert_eq!(ReviewConfig::parse("\n  \n").unwrap(), ReviewConfig::default());
    }

    #[test]
    fn blank_prompt_is_ignored() {
        let config = ReviewConfig::parse("prompt: \"   \"").unwrap();
        assert_eq!(config.custom_prompt(), None);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(ReviewConfig::parse("focus_areas: [unterminated").is_err());
    }

    #[test]
    fn load_treats_missing_and_invalid_files_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        assert_eq!(ReviewConfig::load(&path), None);

        std::fs::write(&path, "focus_areas: [unterminated").unwrap();
        assert_eq!(ReviewConfig::load(&path), None);

        std::fs::write(&path, "context: Rails app").unwrap();
        assert_eq!(
            ReviewConfig::load(&path).and_then(|c| c.context),
            Some("Rails app".into())
        );
    }
}
