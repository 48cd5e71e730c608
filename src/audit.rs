//! Dependency audit reporting.
//!
//! Reads the newline-delimited JSON written by `yarn audit --json`
//! (table rows keyed by column name), keeps advisories at or above a
//! severity threshold, and renders them as a pull request comment.

use std::{fmt, str::FromStr};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::types::{Forge, PullRequestRef};

/// Also used to find a previous report on the pull request.
pub const REPORT_HEADING: &str = "## 🔒 NPM Audit Results";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "moderate" => Ok(Severity::Moderate),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => anyhow::bail!("Invalid severity threshold: {other}"),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub module: String,
    pub severity: Severity,
    pub versions: String,
    pub id: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct AuditRow {
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    children: Option<AuditColumns>,
}

/// Text columns are rendered as-is whatever their JSON type.
#[derive(Debug, Deserialize)]
struct AuditColumns {
    #[serde(rename = "Severity")]
    severity: Option<String>,
    #[serde(rename = "Vulnerable Versions", default)]
    versions: Option<serde_json::Value>,
    #[serde(rename = "ID", default)]
    id: Option<serde_json::Value>,
    #[serde(rename = "Issue", default)]
    issue: Option<serde_json::Value>,
    #[serde(rename = "URL", default)]
    url: Option<serde_json::Value>,
}

fn cell_text(cell: Option<serde_json::Value>) -> String {
    match cell {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

impl AuditRow {
    fn into_advisory(self) -> Option<Advisory> {
        let columns = self.children?;
        let severity = columns.severity?.parse().ok()?;
        Some(Advisory {
            module: cell_text(self.value),
            severity,
            versions: cell_text(columns.versions),
            id: cell_text(columns.id),
            title: cell_text(columns.issue),
            url: cell_text(columns.url),
        })
    }
}

/// Parses audit output, skipping lines that are not advisory rows (summary
/// lines, progress output, malformed JSON).
pub fn parse_advisories(input: &str) -> Vec<Advisory> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<AuditRow>(line) {
            Ok(row) => row.into_advisory(),
            Err(e) => {
                debug!(error = %e, "Skipping unparseable audit line");
                None
            }
        })
        .collect()
}

pub fn filter_by_threshold(advisories: Vec<Advisory>, threshold: Severity) -> Vec<Advisory> {
    advisories
        .into_iter()
        .filter(|advisory| advisory.severity >= threshold)
        .collect()
}

pub fn render_report(advisories: &[Advisory], threshold: Severity) -> String {
    let mut body = format!("{REPORT_HEADING}\n");
    body.push_str(&format!(
        "Vulnerabilities detected at severity **{threshold}** or higher:\n\n"
    ));

    for advisory in advisories {
        body.push_str(&format!(
            "- **{}** {}\n",
            advisory.module, advisory.versions
        ));
        body.push_str(&format!("  - Severity: {}\n", advisory.severity));
        body.push_str(&format!("  - ID: {}\n", advisory.id));
        body.push_str(&format!("  - Title: {}\n", advisory.title));
        body.push_str(&format!("  - URL: {}\n\n", advisory.url));
    }

    body
}

/// Whether the report replaced an earlier one or started a new comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publication {
    Updated(u64),
    Created(u64),
}

/// Posts `body` to `pr`, editing the previous report in place when there
/// is one.
pub async fn publish_report<F>(forge: &F, pr: &PullRequestRef, body: &str) -> Result<Publication>
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
            .is_some_and(|body| body.contains(REPORT_HEADING))
    });

    match existing {
        Some(comment) => {
            forge
                .update_issue_comment(&pr.repo, comment.id, body)
                .await
                .with_context(|| format!("Failed to update audit comment {}", comment.id))?;
            info!(comment_id = comment.id, "Updated existing comment");
            Ok(Publication::Updated(comment.id))
        }
        None => {
            let id = forge
                .create_issue_comment(pr, body)
                .await
                .with_context(|| format!("Failed to post audit comment on {pr}"))?;
            info!(comment_id = id, "Created new comment");
            Ok(Publication::Created(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUDIT: &str = r#"{"type":"auditAdvisory","data":{}}
{"value":"lodash","children":{"ID":1523,"Issue":"Prototype Pollution","URL":"https://npmjs.com/advisories/1523","Severity":"high","Vulnerable Versions":"<4.17.19"}}
not json
{"value":"minimist","children":{"ID":"1179","Issue":"Prototype Pollution","Severity":"Low","Vulnerable Versions":"<0.2.1"}}
{"value":"node-fetch","children":{"ID":"GHSA-r683","Issue":"Exposure of headers","URL":"https://github.com/advisories/GHSA-r683","Severity":"critical","Vulnerable Versions":"<2.6.7"}}
{"value":"summary","children":{"Count":3}}
"#;

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::Low < Severity::Moderate);
        assert!(Severity::High < Severity::Critical);
        assert_eq!("CRITICAL".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("severe".parse::<Severity>().is_err());
    }

    #[test]
    fn parses_only_advisory_rows() {
        let advisories = parse_advisories(AUDIT);
        let modules: Vec<_> = advisories.iter().map(|a| a.module.as_str()).collect();
        assert_eq!(modules, ["lodash", "minimist", "node-fetch"]);
        assert_eq!(advisories[0].id, "1523");
        assert_eq!(advisories[1].severity, Severity::Low);
        assert_eq!(advisories[1].url, "");
    }

    #[test]
    fn keeps_rows_with_non_string_columns() {
        let input = r#"{"value":"left-pad","children":{"ID":42,"Issue":404,"URL":null,"Severity":"moderate","Vulnerable Versions":["<1.3.0"]}}"#;
        let advisories = parse_advisories(input);
        assert_eq!(
            advisories,
            [Advisory {
                module: "left-pad".into(),
                severity: Severity::Moderate,
                versions: r#"["<1.3.0"]"#.into(),
                id: "42".into(),
                title: "404".into(),
                url: String::new(),
            }]
        );
    }

    #[test]
    fn filters_below_threshold() {
        let advisories = filter_by_threshold(parse_advisories(AUDIT), Severity::High);
        let modules: Vec<_> = advisories.iter().map(|a| a.module.as_str()).collect();
        assert_eq!(modules, ["lodash", "node-fetch"]);

        assert!(filter_by_threshold(parse_advisories(AUDIT), Severity::Critical).len() == 1);
    }

    #[test]
    fn renders_markdown_report() {
        let advisories = filter_by_threshold(parse_advisories(AUDIT), Severity::Critical);
        let report = render_report(&advisories, Severity::Critical);
        assert_eq!(
            report,
            "## 🔒 NPM Audit Results\n\
             Vulnerabilities detected at severity **critical** or higher:\n\n\
             - **node-fetch** <2.6.7\n  \
             - Severity: critical\n  \
             - ID: GHSA-r683\n  \
             - Title: Exposure of headers\n  \
             - URL: https://github.com/advisories/GHSA-r683\n\n"
        );
    }
}
