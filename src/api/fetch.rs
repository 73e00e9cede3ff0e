//! Full issue re-read. The webhook payload is a summary and may be stale by
//! the time the agent runs, so nothing from it is trusted beyond the issue
//! id.

use serde::Deserialize;

use super::types::{Comment, Issue};
use super::{TrackerClient, queries};
use crate::errors::ApiError;

/// A complete read of one issue and its comment thread.
#[derive(Debug, Clone)]
pub struct IssueSnapshot {
    pub issue: Issue,
    /// Comment thread in tracker order; empty when the issue has none.
    pub comments: Vec<Comment>,
}

#[derive(Debug, Deserialize)]
struct IssueQueryData {
    issue: Option<Issue>,
}

/// Fetches the issue and all of its comments.
pub async fn fetch_issue(
    client: &TrackerClient,
    issue_id: &str,
) -> Result<IssueSnapshot, ApiError> {
    let data: IssueQueryData = client
        .request(
            queries::ISSUE_WITH_COMMENTS_QUERY,
            serde_json::json!({ "issueId": issue_id }),
        )
        .await?;

    let Some(mut issue) = data.issue else {
        return Err(ApiError::IssueNotFound(issue_id.to_string()));
    };

    let comments = issue
        .comments
        .take()
        .map(|connection| connection.nodes)
        .unwrap_or_default();

    Ok(IssueSnapshot { issue, comments })
}
