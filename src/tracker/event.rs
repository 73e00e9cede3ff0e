//! Wire types for the inbound repository_dispatch envelope and the relayed
//! tracker webhook it carries (subset of fields we care about).
//!
//! The webhook body is relayed verbatim into `client_payload`; its `data`
//! shape depends on the `type` tag, so it stays a raw value here and the
//! normalizer decides how to read it.

use serde::Deserialize;
use serde_json::Value;

/// Outer repository_dispatch event wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchEvent {
    pub action: String,
    #[serde(default)]
    pub client_payload: Option<ClientPayload>,
    #[serde(default)]
    pub repository: Option<EventRepository>,
    #[serde(default)]
    pub sender: Option<EventSender>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRepository {
    pub name: String,
    pub owner: RepositoryOwner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventSender {
    pub login: String,
}

/// Relayed tracker webhook body.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientPayload {
    pub action: String,
    /// Entity kind tag: `"Issue"`, `"Comment"`, or another tracker entity.
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
    /// For comment events this points at the comment (fragment-qualified),
    /// not the issue.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<String>,
}

/// Issue payload as delivered by the webhook. This is a summary shape; the
/// fetcher re-reads the full issue before the agent runs.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookIssue {
    pub id: String,
    /// Team-prefixed display code, e.g. `ENG-123`.
    pub identifier: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub team: TeamRef,
    #[serde(default)]
    pub actor: Option<UserRef>,
}

/// Comment payload as delivered by the webhook. Carries only a thin
/// projection of its parent issue.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookComment {
    pub id: String,
    pub body: String,
    pub issue: CommentIssueRef,
    pub user: UserRef,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentIssueRef {
    pub id: String,
    pub identifier: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRef {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}
