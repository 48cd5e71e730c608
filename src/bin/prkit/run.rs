use anyhow::{Context, Result};
use prkit::{
    GitHub,
    actions::{StepOutputs, workflow_command},
    audit::{self, Publication},
    cleanup_previous_reviews,
    cli::{AuditSpec, CleanupSpec, ExclusionSpec, PromptSpec, TitleSpec},
    config::ReviewConfig,
    exclusion::check_title_exclusion,
    prompt::build_prompt,
    title::{self, ReminderAction},
};
use tracing::{error, info};

pub async fn cleanup(github: &GitHub, spec: &CleanupSpec, outputs: &StepOutputs) -> Result<()> {
    let identity = spec.identity.build()?;
    let summary = cleanup_previous_reviews(github, &spec.pr, identity.as_ref(), &spec.options).await?;
    let record = summary.record();

    outputs.set_output("comments_deleted", &record.comments_deleted.to_string())?;
    outputs.set_output("threads_resolved", &record.threads_resolved.to_string())?;
    println!("{}", serde_json::to_string(&record)?);

    if summary.is_complete() {
        return Ok(());
    }

    for failure in &summary.failures {
        error!(target_id = %failure.target, "{failure}");
        if outputs.is_active() {
            println!("{}", workflow_command("warning", &failure.to_string()));
        }
    }

    if spec.allow_partial {
        info!(failed = summary.failures.len(), "Partial cleanup accepted");
        Ok(())
    } else {
        anyhow::bail!(
            "{} of the cleanup requests failed; rerun to retry",
            summary.failures.len()
        )
    }
}

pub async fn lint_title(github: &GitHub, spec: &TitleSpec) -> Result<()> {
    let outcome = title::lint_title(github, &spec.pr, &spec.title).await?;

    if outcome.reminder == ReminderAction::Posted {
        info!(pr = %spec.pr, "Posted Conventional Commit reminder");
    }

    if !outcome.valid {
        anyhow::bail!("PR title does not follow Conventional Commit rules.");
    }

    Ok(())
}

pub async fn audit(github: Option<&GitHub>, spec: &AuditSpec, outputs: &StepOutputs) -> Result<()> {
    let input = std::fs::read_to_string(&spec.file)
        .with_context(|| format!("Failed to read {}", spec.file.display()))?;
    let advisories = audit::filter_by_threshold(audit::parse_advisories(&input), spec.threshold);

    if advisories.is_empty() {
        info!("No {} or higher advisories found in JSON.", spec.threshold);
        return Ok(());
    }

    let body = audit::render_report(&advisories, spec.threshold);
    outputs.set_output("body", &body)?;

    if let (Some(github), Some(pr)) = (github, &spec.pr) {
        match audit::publish_report(github, pr, &body).await? {
            Publication::Updated(id) => info!("Updated existing comment #{id}"),
            Publication::Created(id) => info!("Created new comment #{id}"),
        }
    } else {
        println!("{body}");
    }

    outputs.export_variable("VULNS_FOUND", "true")?;

    if spec.fail_on_findings {
        anyhow::bail!(
            "{} advisories at severity {} or higher",
            advisories.len(),
            spec.threshold
        );
    }

    Ok(())
}

pub fn prompt(spec: &PromptSpec, outputs: &StepOutputs) -> Result<()> {
    let config = ReviewConfig::load(&spec.config);
    let prompt = build_prompt(config.as_ref());

    if outputs.is_active() {
        outputs.set_output("review_prompt", &prompt)?;
        info!("Review prompt written to GITHUB_OUTPUT");
    } else {
        println!("Generated review prompt:");
        println!("---");
        println!("{prompt}");
        println!("---");
    }

    Ok(())
}

pub fn check_exclusion(spec: &ExclusionSpec, outputs: &StepOutputs) -> Result<()> {
    let config = ReviewConfig::load(&spec.config);
    let result = check_title_exclusion(&spec.title, config.as_ref().and_then(|c| c.exclude.as_ref()));

    match &result.reason {
        Some(reason) => info!(title = %spec.title, "Skipping AI review: {reason}"),
        None => info!(title = %spec.title, "PR is eligible for AI review"),
    }

    outputs.set_output("excluded", if result.excluded { "true" } else { "false" })?;
    if let Some(reason) = &result.reason {
        outputs.set_output("reason", reason)?;
    }
    println!("{}", serde_json::to_string(&result)?);

    Ok(())
}
