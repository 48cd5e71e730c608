//! GitHub Actions plumbing: the triggering event and step outputs.

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

/// The parts of a `pull_request` event payload the scripts read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventPullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub pull_request: Option<EventPullRequest>,
}

/// Reads the webhook payload GitHub Actions writes to `GITHUB_EVENT_PATH`.
pub fn read_event(path: &Path) -> Result<EventPayload> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event payload {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse event payload {}", path.display()))
}

/// Legacy workflow-command escaping for values that must fit on one line.
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Formats a workflow command such as `::warning::message`, which the
/// runner turns into an annotation on the run.
pub fn workflow_command(command: &str, message: &str) -> String {
    format!("::{command}::{}", escape_data(message))
}

/// Files the runner exposes for step outputs (`GITHUB_OUTPUT`) and for
/// environment exports (`GITHUB_ENV`). Outside Actions both are absent and
/// values are only logged.
#[derive(Debug, Clone, Default)]
pub struct StepOutputs {
    output_file: Option<PathBuf>,
    env_file: Option<PathBuf>,
}

impl StepOutputs {
    pub fn new(output_file: Option<PathBuf>, env_file: Option<PathBuf>) -> Self {
        Self {
            output_file,
            env_file,
        }
    }

    pub fn from_env() -> Self {
        let path = |name: &str| {
            std::env::var_os(name)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self::new(path("GITHUB_OUTPUT"), path("GITHUB_ENV"))
    }

    pub fn is_active(&self) -> bool {
        self.output_file.is_some()
    }

    pub fn set_output(&self, name: &str, value: &str) -> Result<()> {
        match &self.output_file {
            Some(path) => append_entry(path, name, value),
            None => {
                info!(output = name, value, "Step output (GITHUB_OUTPUT unset)");
                Ok(())
            }
        }
    }

    pub fn export_variable(&self, name: &str, value: &str) -> Result<()> {
        match &self.env_file {
            Some(path) => append_entry(path, name, value),
            None => {
                info!(variable = name, value, "Environment export (GITHUB_ENV unset)");
                Ok(())
            }
        }
    }
}

/// Multi-line values use the `name<<DELIMITER` form, with a delimiter that
/// does not occur in the value.
fn format_entry(name: &str, value: &str) -> String {
    if !value.contains('\n') && !value.contains('\r') {
        return format!("{name}={value}\n");
    }

    let mut delimiter = format!("PRKIT_EOF_{}", std::process::id());
    while value.contains(&delimiter) {
        delimiter.push('_');
    }
    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}

fn append_entry(path: &Path, name: &str, value: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(format_entry(name, value).as_bytes())
        .with_context(|| format!("Failed to write '{name}' to {}", path.display()))
}
