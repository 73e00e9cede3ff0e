//! Orchestration of one relay run.
//!
//! Steps run strictly in sequence; each one's input depends on the previous
//! step's output, and any failure aborts the rest and propagates. Failures
//! before the tracking comment exists leave no trace on the tracker. Once
//! the comment exists its id is a capability token: the caller carries it in
//! [`TrackerCleanup`] to [`finalize_run`] after the agent process exits, and
//! losing it orphans the comment in its last-written state.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::TrackerClient;
use crate::api::comments::{RunOutcome, TrackingComment, finalize_body, write_comment_body};
use crate::api::fetch::fetch_issue;
use crate::branch::{configure_git_auth, derive_branch_name, setup_working_branch};
use crate::config::RunConfig;
use crate::errors::CommentError;
use crate::prompt::{PromptOptions, build_prompt};
use crate::tools::{build_agent_args, merge_allowed_tools};
use crate::tracker::{DispatchEvent, TrackerContext};

/// Branches involved in the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchInfo {
    pub working_branch: String,
    pub base_branch: String,
    pub current_branch: String,
}

/// Everything the finalize step needs, and nothing else. Passed downstream
/// unchanged so finalize can run after [`prepare`] has returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerCleanup {
    pub api_key: String,
    pub issue_id: String,
    pub comment_id: String,
}

/// External contract of the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareResult {
    pub branch_info: BranchInfo,
    /// Prompt document the agent consumes on stdin.
    pub prompt: String,
    /// Arguments this core contributes to the agent CLI.
    pub agent_args: Vec<String>,
    /// Present for tracker-originated runs; the handle for the later
    /// finalize call.
    pub tracker_cleanup: Option<TrackerCleanup>,
}

/// Runs the prepare sequence: normalize → tracking comment → fetch → branch
/// setup → credentials → prompt → agent arguments.
pub async fn prepare(event: &DispatchEvent, config: &RunConfig) -> Result<PrepareResult> {
    let context = TrackerContext::from_event(event)
        .context("Failed to parse tracker context from dispatch event")?;
    info!(
        identifier = %context.identifier,
        title = %context.title,
        "parsed tracker context"
    );

    let client = TrackerClient::with_endpoint(&config.api_endpoint, &config.api_key);

    let comment = TrackingComment::create(&client, &context.issue_id, &config.job_url)
        .await
        .context("Failed to create tracking comment")?;
    info!(comment_id = %comment.id(), "created tracking comment");

    let snapshot = fetch_issue(&client, &context.issue_id)
        .await
        .context("Failed to fetch issue data")?;
    info!(comments = snapshot.comments.len(), "fetched issue snapshot");

    let branch = derive_branch_name(&config.branch_prefix, &context.identifier, Utc::now());
    setup_working_branch(&branch, &config.base_branch)
        .await
        .context("Failed to set up working branch")?;
    configure_git_auth(config)
        .await
        .context("Failed to configure git credentials")?;
    info!(branch = %branch, base = %config.base_branch, "working branch ready");

    let prompt = build_prompt(
        &context,
        &snapshot,
        &PromptOptions {
            repository: config.repository.clone(),
            branch: Some(branch.clone()),
            base_branch: config.base_branch.clone(),
            comment_id: comment.id().to_string(),
            job_url: config.job_url.clone(),
            server_url: config.server_url.clone(),
        },
    );

    let allowed_tools = merge_allowed_tools(&config.user_allowed_tools);
    let agent_args = build_agent_args(config, comment.id(), &allowed_tools)?;

    Ok(PrepareResult {
        branch_info: BranchInfo {
            working_branch: branch.clone(),
            base_branch: config.base_branch.clone(),
            current_branch: branch,
        },
        prompt,
        agent_args,
        tracker_cleanup: Some(TrackerCleanup {
            api_key: config.api_key.clone(),
            issue_id: context.issue_id.clone(),
            comment_id: comment.id().to_string(),
        }),
    })
}

/// The only way to close out a run: writes the terminal tracking-comment
/// body for the observed outcome. Invoked by the outer caller after the
/// agent process exits, possibly long after [`prepare`] returned.
pub async fn finalize_run(
    cleanup: &TrackerCleanup,
    outcome: &RunOutcome,
    api_endpoint: &str,
) -> Result<(), CommentError> {
    let client = TrackerClient::with_endpoint(api_endpoint, &cleanup.api_key);
    write_comment_body(&client, &cleanup.comment_id, &finalize_body(outcome)).await
}
