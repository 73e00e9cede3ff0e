//! Normalization of the heterogeneous webhook payload into one canonical
//! context.
//!
//! Issue payloads and comment payloads read different source-of-truth fields
//! for semantically the same attribute (`team_key`, `actor_name`) because the
//! webhook shapes are asymmetric: comment payloads are thin projections,
//! issue payloads are fuller. This module is the single place that
//! asymmetry is resolved; nothing downstream sees two shapes.

use serde::Serialize;

use super::event::{DispatchEvent, WebhookComment, WebhookIssue};
use crate::errors::ContextError;

/// Canonical, shape-independent representation of a triggering event.
/// Constructed once per run, immutable thereafter.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerContext {
    /// Opaque tracker-internal issue id.
    pub issue_id: String,
    /// Human display code, e.g. `ENG-123`.
    pub identifier: String,
    pub title: String,
    pub description: Option<String>,
    pub issue_url: String,
    /// Set together with `trigger_comment_id` when a comment triggered the
    /// run; both absent for issue-triggered runs.
    pub trigger_comment_body: Option<String>,
    pub trigger_comment_id: Option<String>,
    /// Display name of the human who triggered the run.
    pub actor_name: String,
    pub team_key: String,
}

impl TrackerContext {
    /// Parses the canonical context out of a dispatch envelope.
    pub fn from_event(event: &DispatchEvent) -> Result<Self, ContextError> {
        let payload = event
            .client_payload
            .as_ref()
            .ok_or(ContextError::MissingPayload)?;

        if payload.kind == "Comment" {
            let comment: WebhookComment =
                serde_json::from_value(payload.data.clone()).map_err(ContextError::Malformed)?;

            // The comment url (or the envelope's top-level url) points at the
            // comment itself; the issue url is everything before the fragment.
            // A comment payload may expose issue-scoped url fields, but those
            // are not trusted here.
            let comment_url = comment
                .url
                .clone()
                .or_else(|| payload.url.clone())
                .unwrap_or_default();

            Ok(Self {
                issue_id: comment.issue.id,
                identifier: comment.issue.identifier.clone(),
                title: comment.issue.title,
                description: None,
                issue_url: strip_fragment(&comment_url).to_string(),
                trigger_comment_body: Some(comment.body),
                trigger_comment_id: Some(comment.id),
                actor_name: comment.user.name,
                team_key: team_key_from_identifier(&comment.issue.identifier),
            })
        } else {
            // Issue events (create, update, ...). Anything that is not a
            // comment is read as an issue; a mismatched shape fails below.
            let issue: WebhookIssue =
                serde_json::from_value(payload.data.clone()).map_err(ContextError::Malformed)?;

            // Issue events do not identify the triggering human beyond an
            // optional actor record and the envelope sender.
            let actor_name = issue
                .actor
                .map(|actor| actor.name)
                .or_else(|| event.sender.as_ref().map(|sender| sender.login.clone()))
                .unwrap_or_else(|| "unknown".to_string());

            Ok(Self {
                issue_id: issue.id,
                identifier: issue.identifier,
                title: issue.title,
                description: issue.description,
                issue_url: issue
                    .url
                    .or_else(|| payload.url.clone())
                    .unwrap_or_default(),
                trigger_comment_body: None,
                trigger_comment_id: None,
                actor_name,
                // The issue's own team record is authoritative, unlike the
                // identifier-derived key used for comment payloads.
                team_key: issue.team.key,
            })
        }
    }

    /// True when a comment (rather than an issue event) triggered the run.
    pub fn is_comment_triggered(&self) -> bool {
        self.trigger_comment_body.is_some()
    }
}

/// Truncates a url at the first `#`.
fn strip_fragment(url: &str) -> &str {
    match url.split_once('#') {
        Some((base, _)) => base,
        None => url,
    }
}

/// Team key is the identifier prefix before the first `-`; empty when the
/// identifier has no `-`.
fn team_key_from_identifier(identifier: &str) -> String {
    match identifier.split_once('-') {
        Some((prefix, _)) => prefix.to_string(),
        None => String::new(),
    }
}
