//! Typed error hierarchy for the relay pipeline.
//!
//! Three top-level enums cover the three subsystems:
//! - `ContextError` — dispatch-envelope normalization failures
//! - `ApiError` — tracker wire failures
//! - `CommentError` — tracking-comment lifecycle failures

use thiserror::Error;

/// Errors from normalizing a repository_dispatch envelope into a
/// [`crate::tracker::TrackerContext`].
#[derive(Debug, Error)]
pub enum ContextError {
    /// The dispatch envelope itself is malformed; the tracker was never
    /// involved.
    #[error("Missing client_payload in repository_dispatch event")]
    MissingPayload,

    #[error("Malformed webhook payload: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Errors from the tracker GraphQL API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP exchange itself failed with a non-2xx status.
    #[error("Tracker API request failed: {status} {reason}")]
    Transport { status: u16, reason: String },

    /// The response reported one or more GraphQL errors; the message is the
    /// semicolon-joined list in response order.
    #[error("Tracker GraphQL errors: {0}")]
    Protocol(String),

    /// A 2xx response with neither errors nor a data payload.
    #[error("Tracker API returned no data")]
    EmptyResult,

    #[error("Tracker issue not found: {0}")]
    IssueNotFound(String),

    #[error("Failed to exchange request with tracker API: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected tracker response shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Errors from the tracking-comment lifecycle. A failed create leaves no
/// comment at all; a failed update leaves the comment in its prior,
/// last-successfully-written state.
#[derive(Debug, Error)]
pub enum CommentError {
    /// The tracker accepted the call but reported the create unsuccessful.
    #[error("Tracker rejected the tracking-comment create")]
    CreateFailed,

    /// The tracker accepted the call but reported the update unsuccessful.
    #[error("Tracker rejected the tracking-comment update")]
    UpdateFailed,

    #[error(transparent)]
    Api(#[from] ApiError),
}
