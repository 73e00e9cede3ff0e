//! Wire types for tracker API responses (subset of fields we use).

use serde::Deserialize;

/// Full denormalized issue as returned by the issue-with-comments query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub identifier: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    pub state: IssueState,
    pub priority: i64,
    pub priority_label: String,
    pub team: Team,
    #[serde(default)]
    pub assignee: Option<Assignee>,
    #[serde(default)]
    pub labels: Option<LabelConnection>,
    #[serde(default)]
    pub comments: Option<CommentConnection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueState {
    pub name: String,
    /// State category (`unstarted`, `started`, `completed`, ...); the wire
    /// field is named `type`.
    #[serde(rename = "type")]
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assignee {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelConnection {
    pub nodes: Vec<Label>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentConnection {
    pub nodes: Vec<Comment>,
}

/// A read-only projection of one issue comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub created_at: String,
    #[serde(default)]
    pub user: Option<CommentAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentAuthor {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}
