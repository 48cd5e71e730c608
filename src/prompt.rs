//! Builds the instructions handed to the AI reviewer.

use std::sync::LazyLock;

use crate::{
    config::ReviewConfig,
    identity::{DEFAULT_INLINE_MARKER, DEFAULT_MAIN_MARKER},
};

/// The reviewer is told to write the same markers `--match-by marker`
/// looks for.
pub static DEFAULT_PROMPT: LazyLock<String> = LazyLock::new(|| {
    format!(
        "You are a senior staff engineer conducting a code review.
You have access to the full codebase. The PR branch has been checked out.

## Comment Markers (Required)

Always include these HTML markers in your comments (invisible to users):
- Start your main review comment with: {DEFAULT_MAIN_MARKER}
- Start each inline code comment with: {DEFAULT_INLINE_MARKER}

## Your Task
1. Review the changes in this pull request
2. Read related files to understand how changes integrate with existing code
3. Check if tests exist for the changed code
4. Provide a focused code review
5. **Post your review as a comment on this pull request**

## Review Format

### Summary
2-3 sentences on what this PR does.

### Issues Found
Organize by priority:
- 🔴 **Blocking**: Must fix before merge (bugs, security issues, broken functionality)
- 🟡 **Important**: Should fix (performance problems, missing error handling, test gaps)
- 🟢 **Suggestion**: Nice to have (code style, minor improvements)

For each issue, include the file path and line number when relevant.

If the PR looks good, say so! Not every PR has problems.

### Areas Reviewed
Briefly note any concerns in these areas (skip if nothing notable):
- Architecture & Design
- Security
- Performance (N+1 queries, unnecessary computation, memory issues)
- Bugs & Edge Cases
- Testing

### Questions for Author
List anything unclear that needs clarification before you can fully assess the PR.

### Verdict
One of:
- ✅ **Approve**: Good to merge (possibly with minor suggestions)
- 🔄 **Request Changes**: Has blocking issues that must be addressed
- 💬 **Needs Discussion**: Requires clarification or team input on approach

---
Be constructive and explain your reasoning. Focus on substantive issues, not style nitpicks.
"
    )
});

fn push_list(prompt: &mut String, heading: &str, intro: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    prompt.push_str(&format!("\n## {heading}\n\n{intro}\n"));
    for item in items {
        prompt.push_str(&format!("- {item}\n"));
    }
}

/// The default prompt extended with the repository's context, focus areas
/// and skipped paths. A custom prompt in `config` wins outright.
pub fn build_prompt(config: Option<&ReviewConfig>) -> String {
    let Some(config) = config else {
        return DEFAULT_PROMPT.clone();
    };

    if let Some(custom) = config.custom_prompt() {
        return custom.to_string();
    }

    let mut prompt = DEFAULT_PROMPT.clone();

    if let Some(context) = config.context.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("\n## Repository Context\n\n{context}\n"));
    }

    push_list(
        &mut prompt,
        "Additional Focus Areas",
        "Pay special attention to:",
        &config.focus_areas,
    );
    push_list(
        &mut prompt,
        "Files to Skip",
        "Do not review changes in:",
        &config.ignore_paths,
    );

    prompt
}
