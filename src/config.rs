//! Run-scoped configuration.
//!
//! Loaded once at startup from CLI flags and environment, then passed down
//! by reference; no component re-reads the environment after this point.

/// Everything one relay run needs to know. The API key is the only shared
/// resource between components and is read-only for the run's duration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Tracker API credential, sent raw in the Authorization header.
    pub api_key: String,
    /// Tracker GraphQL endpoint.
    pub api_endpoint: String,
    /// `owner/repo` slug of the repository the agent works in.
    pub repository: String,
    /// Git-host base URL, e.g. `https://github.com`.
    pub server_url: String,
    /// Link to this job run, shown in tracking comments and the prompt.
    pub job_url: String,
    /// Branch the working branch is created from.
    pub base_branch: String,
    /// Prefix for derived working-branch names, e.g. `agent/`.
    pub branch_prefix: String,
    /// Command used to start the agent process.
    pub agent_cmd: String,
    /// Extra agent CLI arguments supplied by the caller, appended verbatim
    /// after the relay's own.
    pub user_agent_args: String,
    /// Externally supplied additions to the tool allow-list.
    pub user_allowed_tools: Vec<String>,
    /// How the agent's MCP configuration should invoke this binary for the
    /// comment-server subcommand.
    pub relay_cmd: String,
    pub git_user_name: String,
    pub git_user_email: String,
    /// Token for authenticated pushes; identity-only configuration when
    /// absent.
    pub git_token: Option<String>,
}

impl RunConfig {
    /// Job-run URL in the git host's actions UI, for callers that know only
    /// the run id.
    pub fn job_url_for_run(server_url: &str, repository: &str, run_id: &str) -> String {
        format!("{server_url}/{repository}/actions/runs/{run_id}")
    }
}

#[cfg(test)]
impl RunConfig {
    /// Fixture with every field populated; tests override what they probe.
    pub fn for_tests() -> Self {
        Self {
            api_key: "lin_api_test".to_string(),
            api_endpoint: crate::api::DEFAULT_ENDPOINT.to_string(),
            repository: "test-owner/test-repo".to_string(),
            server_url: "https://github.com".to_string(),
            job_url: "https://github.com/test-owner/test-repo/actions/runs/12345".to_string(),
            base_branch: "main".to_string(),
            branch_prefix: "agent/".to_string(),
            agent_cmd: "claude".to_string(),
            user_agent_args: String::new(),
            user_allowed_tools: Vec::new(),
            relay_cmd: "agent-relay".to_string(),
            git_user_name: "agent-relay[bot]".to_string(),
            git_user_email: "agent-relay[bot]@users.noreply.github.com".to_string(),
            git_token: None,
        }
    }
}
