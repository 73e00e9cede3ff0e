//! Tracking-comment lifecycle.
//!
//! Each run owns exactly one progress comment on the tracker issue. The
//! handle carries its lifecycle phase explicitly: `created` on a successful
//! create, `updated` after any number of body overwrites, `finalized` once
//! the terminal write lands. There is no transition out of `finalized`;
//! writes against a finalized handle are logged no-ops. The comment is
//! never deleted.

use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::{TrackerClient, queries};
use crate::branch::{branch_url, compare_url};
use crate::errors::CommentError;
use crate::sanitize::sanitize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentPhase {
    Created,
    Updated,
    Finalized,
}

/// Handle to the run's progress comment. The id is the only capability later
/// operations need; the issue id is not required again after create.
#[derive(Debug, Clone)]
pub struct TrackingComment {
    id: String,
    phase: CommentPhase,
}

/// Outcome reported once the agent process has exited.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub success: bool,
    /// Present only when the agent left commits on a working branch.
    pub branch_name: Option<String>,
    pub base_branch: String,
    pub repository: String,
    pub job_url: String,
    pub server_url: String,
}

#[derive(Debug, Deserialize)]
struct CreateCommentData {
    #[serde(rename = "commentCreate")]
    comment_create: CommentWrite,
}

#[derive(Debug, Deserialize)]
struct UpdateCommentData {
    #[serde(rename = "commentUpdate")]
    comment_update: CommentWrite,
}

#[derive(Debug, Deserialize)]
struct CommentWrite {
    success: bool,
    #[serde(default)]
    comment: Option<WrittenComment>,
}

#[derive(Debug, Deserialize)]
struct WrittenComment {
    id: String,
}

impl TrackingComment {
    /// Posts the initial "work started" comment and returns the handle.
    pub async fn create(
        client: &TrackerClient,
        issue_id: &str,
        job_url: &str,
    ) -> Result<Self, CommentError> {
        let body = format!(
            "**The agent is working…** :hourglass_flowing_sand:\n\n[View job run]({job_url})"
        );
        let data: CreateCommentData = client
            .request(
                queries::CREATE_COMMENT_MUTATION,
                json!({ "issueId": issue_id, "body": body }),
            )
            .await?;

        if !data.comment_create.success {
            return Err(CommentError::CreateFailed);
        }
        let id = data
            .comment_create
            .comment
            .ok_or(CommentError::CreateFailed)?
            .id;

        Ok(Self {
            id,
            phase: CommentPhase::Created,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> CommentPhase {
        self.phase
    }

    /// Overwrites the comment body with agent-supplied progress text. The
    /// body is sanitized here, inside the lifecycle boundary, not by
    /// callers.
    pub async fn update(&mut self, client: &TrackerClient, body: &str) -> Result<(), CommentError> {
        if self.phase == CommentPhase::Finalized {
            warn!(comment_id = %self.id, "ignoring update to a finalized tracking comment");
            return Ok(());
        }
        write_comment_body(client, &self.id, &sanitize(body)).await?;
        self.phase = CommentPhase::Updated;
        Ok(())
    }

    /// Terminal write reflecting the run outcome. An update under the hood,
    /// with the same failure mode.
    pub async fn finalize(
        &mut self,
        client: &TrackerClient,
        outcome: &RunOutcome,
    ) -> Result<(), CommentError> {
        if self.phase == CommentPhase::Finalized {
            warn!(comment_id = %self.id, "tracking comment already finalized");
            return Ok(());
        }
        write_comment_body(client, &self.id, &finalize_body(outcome)).await?;
        self.phase = CommentPhase::Finalized;
        Ok(())
    }
}

/// Raw comment overwrite: update mutation plus success check. Shared by the
/// handle methods and the external finalize path, which holds only a
/// comment id.
pub async fn write_comment_body(
    client: &TrackerClient,
    comment_id: &str,
    body: &str,
) -> Result<(), CommentError> {
    let data: UpdateCommentData = client
        .request(
            queries::UPDATE_COMMENT_MUTATION,
            json!({ "commentId": comment_id, "body": body }),
        )
        .await?;
    if !data.comment_update.success {
        return Err(CommentError::UpdateFailed);
    }
    Ok(())
}

/// Body for the terminal write. Failure deliberately carries no error
/// detail: run internals stay out of the public comment.
pub fn finalize_body(outcome: &RunOutcome) -> String {
    if !outcome.success {
        return format!(
            "**The agent encountered an error.** Check the [job run]({}) for details.",
            outcome.job_url
        );
    }

    match &outcome.branch_name {
        Some(branch) => {
            let branch_link = format!(
                "\n\nBranch: [`{branch}`]({})",
                branch_url(&outcome.server_url, &outcome.repository, branch)
            );
            let pr_link = format!(
                "\n[Create a PR]({})",
                compare_url(
                    &outcome.server_url,
                    &outcome.repository,
                    &outcome.base_branch,
                    branch
                )
            );
            format!(
                "**The agent finished the task.**{branch_link}{pr_link}\n\n[View job run]({})",
                outcome.job_url
            )
        }
        None => format!(
            "**The agent finished the task.**\n\n[View job run]({})",
            outcome.job_url
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn outcome(success: bool, branch: Option<&str>) -> RunOutcome {
        RunOutcome {
            success,
            branch_name: branch.map(str::to_string),
            base_branch: "main".to_string(),
            repository: "owner/repo".to_string(),
            job_url: "https://github.com/owner/repo/actions/runs/1".to_string(),
            server_url: "https://github.com".to_string(),
        }
    }

    // ── finalize_body ────────────────────────────────────────────────

    #[test]
    fn test_success_with_branch_links_branch_and_compare() {
        let body = finalize_body(&outcome(true, Some("b")));
        assert!(body.contains("finished the task"));
        assert!(body.contains("https://github.com/owner/repo/tree/b"));
        assert!(body.contains("https://github.com/owner/repo/compare/main...b"));
        assert!(body.contains("View job run"));
    }

    #[test]
    fn test_success_without_branch_omits_links() {
        let body = finalize_body(&outcome(true, None));
        assert!(body.contains("finished the task"));
        assert!(!body.contains("/tree/"));
        assert!(!body.contains("/compare/"));
        assert!(body.contains("View job run"));
    }

    #[test]
    fn test_failure_is_fixed_message_without_detail() {
        let body = finalize_body(&outcome(false, Some("b")));
        assert!(body.contains("encountered an error"));
        assert!(body.contains("job run"));
        // No branch or compare links on failure, even when a branch exists.
        assert!(!body.contains("/tree/"));
        assert!(!body.contains("/compare/"));
    }

    // ── lifecycle over the wire ──────────────────────────────────────

    fn mock_create<'a>(server: &'a MockServer, id: &str) -> httpmock::Mock<'a> {
        let response = serde_json::json!({ "data": { "commentCreate": {
            "success": true,
            "comment": { "id": id, "body": "x", "createdAt": "2024-01-01T00:00:00.000Z" }
        } } });
        server.mock(move |when, then| {
            when.method(POST).body_includes("commentCreate");
            then.status(200).json_body(response.clone());
        })
    }

    fn mock_update(server: &MockServer, success: bool) -> httpmock::Mock<'_> {
        // success=false models a 200 response whose write was rejected.
        let response = serde_json::json!({ "data": { "commentUpdate": {
            "success": success,
            "comment": { "id": "lc-1", "body": "x" }
        } } });
        server.mock(move |when, then| {
            when.method(POST).body_includes("commentUpdate");
            then.status(200).json_body(response.clone());
        })
    }

    #[tokio::test]
    async fn test_create_returns_handle_in_created_phase() {
        let server = MockServer::start();
        let create = mock_create(&server, "lc-uuid-1");

        let client = TrackerClient::with_endpoint(server.base_url(), "key");
        let comment = TrackingComment::create(&client, "issue-uuid-1", "https://job.example")
            .await
            .unwrap();

        create.assert();
        assert_eq!(comment.id(), "lc-uuid-1");
        assert_eq!(comment.phase(), CommentPhase::Created);
    }

    #[tokio::test]
    async fn test_create_reports_unsuccessful_write() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(serde_json::json!({
                "data": { "commentCreate": { "success": false, "comment": null } }
            }));
        });

        let client = TrackerClient::with_endpoint(server.base_url(), "key");
        let err = TrackingComment::create(&client, "issue-uuid-1", "https://job.example")
            .await
            .unwrap_err();
        assert!(matches!(err, CommentError::CreateFailed));
    }

    #[tokio::test]
    async fn test_update_moves_phase_and_sanitizes_body() {
        let server = MockServer::start();
        let create = mock_create(&server, "lc-1");
        let update = server.mock(|when, then| {
            when.method(POST)
                .body_includes("commentUpdate")
                .body_includes("progress so far");
            then.status(200).json_body(serde_json::json!({
                "data": { "commentUpdate": { "success": true, "comment": { "id": "lc-1", "body": "x" } } }
            }));
        });

        let client = TrackerClient::with_endpoint(server.base_url(), "key");
        let mut comment = TrackingComment::create(&client, "i-1", "https://job.example")
            .await
            .unwrap();
        comment
            .update(&client, "progress so far <!-- hidden -->")
            .await
            .unwrap();

        create.assert();
        update.assert();
        assert_eq!(comment.phase(), CommentPhase::Updated);
    }

    #[tokio::test]
    async fn test_update_failure_keeps_prior_phase() {
        let server = MockServer::start();
        let _create = mock_create(&server, "lc-1");
        let _update = mock_update(&server, false);

        let client = TrackerClient::with_endpoint(server.base_url(), "key");
        let mut comment = TrackingComment::create(&client, "i-1", "https://job.example")
            .await
            .unwrap();
        let err = comment.update(&client, "body").await.unwrap_err();
        assert!(matches!(err, CommentError::UpdateFailed));
        assert_eq!(comment.phase(), CommentPhase::Created);
    }

    #[tokio::test]
    async fn test_finalize_then_update_is_a_noop() {
        let server = MockServer::start();
        let _create = mock_create(&server, "lc-1");
        let update = mock_update(&server, true);

        let client = TrackerClient::with_endpoint(server.base_url(), "key");
        let mut comment = TrackingComment::create(&client, "i-1", "https://job.example")
            .await
            .unwrap();
        comment
            .finalize(&client, &outcome(true, Some("b")))
            .await
            .unwrap();
        assert_eq!(comment.phase(), CommentPhase::Finalized);

        // Both later writes must be swallowed without hitting the wire.
        comment.update(&client, "late progress").await.unwrap();
        comment
            .finalize(&client, &outcome(false, None))
            .await
            .unwrap();
        assert_eq!(update.hits(), 1);
        assert_eq!(comment.phase(), CommentPhase::Finalized);
    }
}
