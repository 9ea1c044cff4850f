//! Synthesized server instructions.
//!
//! The briefing is a pure function of the enabled toolset ids: base guidance,
//! then one block per enabled toolset that has guidance (ascending id), then
//! every combination rule whose toolsets are all enabled (declaration order).
//! Blocks are separated by a blank line.

use std::collections::BTreeSet;

/// Guidance included in every briefing.
pub const BASE_INSTRUCTIONS: &str = "\
The forge MCP server exposes the forge's API as tools. Forge API responses can overflow context windows, so:
- Use 'list_*' tools for broad, simple retrieval and pagination of all items of a type.
- Use 'search_*' tools for targeted queries with specific criteria or keywords.
- Paginate with 'page' and 'perPage' and process large datasets in batches of 5-10 items.
- For summaries, fetch minimal data first, then drill down into specifics.";

/// Per-toolset guidance, keyed by toolset id.
pub const TOOLSET_INSTRUCTIONS: &[(&str, &str)] = &[
    (
        "actions",
        "## Actions\n\
         Use 'list_workflow_runs' to locate a failing run, then 'get_job_logs' with 'failed_only' \
         and 'run_id' to read only the failed jobs. Keep 'tail_lines' small; raise it only when the \
         failure is not in the tail.",
    ),
    (
        "context",
        "## Context\n\
         Always call 'get_me' first to understand current user permissions and context.",
    ),
    (
        "discussions",
        "## Discussions\n\
         Use 'list_discussion_categories' to understand available categories before listing \
         discussions. Filter by category for better organization.",
    ),
    (
        "issues",
        "## Issues\n\
         Check 'list_issue_types' first for organizations to use proper issue types. Use \
         'search_issues' before creating new issues to avoid duplicates. Always set 'state_reason' \
         when closing issues.",
    ),
    (
        "notifications",
        "## Notifications\n\
         Filter by 'participating' for issues and pull requests you are involved in. Use \
         'mark_all_notifications_read' with repository filters to avoid marking unrelated \
         notifications.",
    ),
    (
        "pull_requests",
        "## Pull Requests\n\
         For reviews with line-specific comments use 'create_pending_pull_request_review', then \
         'add_comment_to_pending_review', then 'submit_pending_pull_request_review'. Check \
         'get_pull_request_status' before merging.",
    ),
];

/// Cross-cutting guidance emitted only when every listed toolset is enabled.
pub const COMBINATION_RULES: &[(&[&str], &str)] = &[
    (
        &["issues", "pull_requests"],
        "When a pull request resolves an issue, reference it with 'Fixes #<number>' in the pull \
         request body so the issue closes on merge.",
    ),
    (
        &["actions", "pull_requests"],
        "Before merging a pull request, check its CI runs with 'list_workflow_runs' on the head \
         branch and inspect failures with 'get_job_logs'.",
    ),
    (
        &["context", "repos"],
        "Use 'get_me' to learn the current user's login before searching or forking repositories \
         on their behalf.",
    ),
];

/// Build the briefing for a set of enabled toolset ids.
///
/// Returns an empty string when `disabled` is set. Input order and duplicates
/// do not affect the output.
pub fn generate_instructions<S: AsRef<str>>(enabled: &[S], disabled: bool) -> String {
    if disabled {
        return String::new();
    }
    let enabled: BTreeSet<&str> = enabled.iter().map(AsRef::as_ref).collect();

    let mut blocks = vec![BASE_INSTRUCTIONS];
    blocks.extend(
        TOOLSET_INSTRUCTIONS
            .iter()
            .filter(|(id, _)| enabled.contains(id))
            .map(|(_, text)| *text),
    );
    blocks.extend(
        COMBINATION_RULES
            .iter()
            .filter(|(required, _)| required.iter().all(|id| enabled.contains(id)))
            .map(|(_, text)| *text),
    );
    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const NONE: &[&str] = &[];

    #[test]
    fn test_base_only_without_toolsets() {
        let text = generate_instructions(NONE, false);
        assert_eq!(text, BASE_INSTRUCTIONS);
        assert!(!text.contains("## "));
    }

    #[test]
    fn test_context_block_is_deterministic() {
        let a = generate_instructions(&["context"], false);
        let b = generate_instructions(&["context"], false);
        assert_eq!(a, b);
        assert!(a.contains("Always call 'get_me' first"));
    }

    #[test]
    fn test_disabled_is_empty() {
        assert_eq!(generate_instructions(&["context", "issues"], true), "");
    }

    #[test]
    fn test_toolset_blocks() {
        for (id, heading) in [
            ("pull_requests", "## Pull Requests"),
            ("issues", "## Issues"),
            ("discussions", "## Discussions"),
        ] {
            assert!(generate_instructions(&[id], false).contains(heading));
        }
        assert!(!generate_instructions(&["gists"], false).contains("## "));
    }

    #[test]
    fn test_combination_rules_need_every_toolset() {
        let issues_only = generate_instructions(&["issues"], false);
        assert!(!issues_only.contains("Fixes #"));

        let both = generate_instructions(&["pull_requests", "issues", "issues"], false);
        assert!(both.contains("Fixes #"));
        assert_eq!(both, generate_instructions(&["issues", "pull_requests"], false));

        let issues = both.find("## Issues").unwrap();
        let prs = both.find("## Pull Requests").unwrap();
        let rule = both.find("Fixes #").unwrap();
        assert!(issues < prs && prs < rule);
    }

    #[test]
    fn test_toolset_table_is_sorted() {
        let ids: Vec<_> = TOOLSET_INSTRUCTIONS.iter().map(|(id, _)| *id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }
}
