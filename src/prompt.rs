//! Prompt assembly: turns the canonical context and the fetched snapshot
//! into the structured document the agent runs against.
//!
//! All tracker-supplied free text (title, description, comment bodies,
//! trigger comment) passes through the sanitizer before embedding.

use crate::api::fetch::IssueSnapshot;
use crate::api::types::{Comment, Issue};
use crate::branch::compare_url;
use crate::sanitize::sanitize;
use crate::tools::COMMENT_UPDATE_TOOL;
use crate::tracker::TrackerContext;

/// Run metadata the prompt needs beyond the issue data itself.
#[derive(Debug, Clone)]
pub struct PromptOptions {
    pub repository: String,
    /// Working branch, when one was set up for this run.
    pub branch: Option<String>,
    pub base_branch: String,
    /// Tracking-comment id the agent writes progress to.
    pub comment_id: String,
    pub job_url: String,
    pub server_url: String,
}

/// Concise context block: identifier, title, state, priority, team,
/// assignee, labels, url.
pub fn format_issue_context(issue: &Issue) -> String {
    let labels = issue
        .labels
        .as_ref()
        .map(|connection| {
            connection
                .nodes
                .iter()
                .map(|label| label.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|joined| !joined.is_empty())
        .unwrap_or_else(|| "No labels".to_string());

    let assignee = issue
        .assignee
        .as_ref()
        .map(|assignee| assignee.name.as_str())
        .unwrap_or("Unassigned");

    format!(
        "Issue: {} — {}\nState: {} ({})\nPriority: {}\nTeam: {} ({})\nAssignee: {}\nLabels: {}\nURL: {}",
        issue.identifier,
        sanitize(&issue.title),
        issue.state.name,
        issue.state.category,
        issue.priority_label,
        issue.team.name,
        issue.team.key,
        assignee,
        labels,
        issue.url
    )
}

/// Issue description, or the literal placeholder when there is none.
pub fn format_issue_body(issue: &Issue) -> String {
    match &issue.description {
        Some(description) => sanitize(description),
        None => "No description provided".to_string(),
    }
}

/// One block per comment in input order, blank-line separated; the literal
/// `No comments` when the thread is empty.
pub fn format_comments(comments: &[Comment]) -> String {
    if comments.is_empty() {
        return "No comments".to_string();
    }
    comments
        .iter()
        .map(|comment| {
            let author = comment
                .user
                .as_ref()
                .map(|user| user.name.as_str())
                .unwrap_or("Unknown");
            format!(
                "[{author} at {}]: {}",
                comment.created_at,
                sanitize(&comment.body)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the full prompt document.
pub fn build_prompt(
    context: &TrackerContext,
    snapshot: &IssueSnapshot,
    opts: &PromptOptions,
) -> String {
    let trigger_section = match &context.trigger_comment_body {
        Some(body) => format!("<trigger_comment>\n{}\n</trigger_comment>", sanitize(body)),
        None => {
            "No comment triggered this run. Treat the issue body above as the request to fulfill."
                .to_string()
        }
    };

    let branch_instructions = match &opts.branch {
        Some(branch) => {
            let compare = compare_url(&opts.server_url, &opts.repository, &opts.base_branch, branch);
            format!(
                "You are on the working branch `{branch}`, created from `{base}`. Commit your \
                 work there; never push to `{base}` directly.\n\
                 When you finish, update the tracking comment with a summary of your changes and \
                 include this link so a human can open a pull request: [Create a PR]({compare})",
                base = opts.base_branch,
            )
        }
        None => "No working branch was created for this run; do not commit anything.".to_string(),
    };

    format!(
        "You are an AI coding agent handling a request from the team's issue tracker. The \
         issue and its discussion are reproduced below.\n\
         \n\
         <formatted_context>\n{context_block}\n</formatted_context>\n\
         \n\
         <issue_description>\n{description}\n</issue_description>\n\
         \n\
         <comments>\n{comments}\n</comments>\n\
         \n\
         {trigger_section}\n\
         \n\
         <metadata>\n\
         issue_identifier: {identifier}\n\
         issue_url: {issue_url}\n\
         triggered_by: {actor}\n\
         team: {team}\n\
         tracking_comment_id: {comment_id}\n\
         </metadata>\n\
         \n\
         Instructions:\n\
         1. Read the request above and implement it in this repository.\n\
         2. {branch_instructions}\n\
         3. Post progress to the tracker with the {tool} tool; the tracking comment is the \
         only place humans watch this run. Reference the issue ({identifier}, {issue_url}) in \
         any pull request body you write.\n\
         \n\
         [View job run]({job_url})\n",
        context_block = format_issue_context(&snapshot.issue),
        description = format_issue_body(&snapshot.issue),
        comments = format_comments(&snapshot.comments),
        identifier = context.identifier,
        issue_url = context.issue_url,
        actor = context.actor_name,
        team = context.team_key,
        comment_id = opts.comment_id,
        tool = COMMENT_UPDATE_TOOL,
        job_url = opts.job_url,
    )
}
