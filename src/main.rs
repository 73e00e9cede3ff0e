use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use agent_relay::api;
use agent_relay::api::comments::RunOutcome;
use agent_relay::branch::branch_has_commits;
use agent_relay::comment_server::{self, CommentServerConfig};
use agent_relay::config::RunConfig;
use agent_relay::prepare::{PrepareResult, finalize_run, prepare};
use agent_relay::tracker::DispatchEvent;

#[derive(Parser)]
#[command(name = "agent-relay")]
#[command(version, about = "Relays issue-tracker events into automated coding-agent runs")]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare the run, execute the agent, then finalize the tracking comment
    Run(RunArgs),
    /// Prepare only; print the result as JSON for an outer harness
    Prepare(RunArgs),
    /// Serve the tracking-comment update tool over stdio
    CommentServer(CommentServerArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Path to the repository_dispatch event payload (JSON)
    #[arg(long, env = "RELAY_EVENT_PATH")]
    event_file: PathBuf,

    #[arg(long, env = "TRACKER_API_KEY", hide_env_values = true)]
    api_key: String,

    #[arg(long, env = "TRACKER_API_ENDPOINT", default_value = api::DEFAULT_ENDPOINT)]
    api_endpoint: String,

    /// Repository slug, e.g. owner/repo
    #[arg(long, env = "RELAY_REPOSITORY")]
    repository: String,

    #[arg(long, env = "RELAY_SERVER_URL", default_value = "https://github.com")]
    server_url: String,

    /// Link to this job run; derived from --run-id when omitted
    #[arg(long, env = "RELAY_JOB_URL")]
    job_url: Option<String>,

    #[arg(long, env = "RELAY_RUN_ID")]
    run_id: Option<String>,

    #[arg(long, env = "RELAY_BASE_BRANCH", default_value = "main")]
    base_branch: String,

    #[arg(long, env = "RELAY_BRANCH_PREFIX", default_value = "agent/")]
    branch_prefix: String,

    /// Command used to start the agent process
    #[arg(long, env = "RELAY_AGENT_CMD", default_value = "claude")]
    agent_cmd: String,

    /// Extra agent CLI arguments, appended verbatim after the relay's own
    #[arg(long, env = "RELAY_AGENT_ARGS", default_value = "")]
    agent_args: String,

    /// Additional allowed tools (comma-separated)
    #[arg(long, env = "RELAY_ALLOWED_TOOLS", value_delimiter = ',')]
    allowed_tools: Vec<String>,

    #[arg(long, env = "RELAY_GIT_TOKEN", hide_env_values = true)]
    git_token: Option<String>,

    #[arg(long, env = "RELAY_GIT_USER_NAME", default_value = "agent-relay[bot]")]
    git_user_name: String,

    #[arg(
        long,
        env = "RELAY_GIT_USER_EMAIL",
        default_value = "agent-relay[bot]@users.noreply.github.com"
    )]
    git_user_email: String,
}

#[derive(Args)]
struct CommentServerArgs {
    #[arg(long, env = "TRACKER_API_KEY", hide_env_values = true)]
    api_key: String,

    #[arg(long, env = "TRACKER_COMMENT_ID")]
    comment_id: String,

    #[arg(long, env = "TRACKER_API_ENDPOINT", default_value = api::DEFAULT_ENDPOINT)]
    api_endpoint: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Stderr writer: stdout is the comment server's protocol stream and the
    // prepare command's JSON output.
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::Prepare(args) => cmd_prepare(args).await,
        Commands::CommentServer(args) => {
            comment_server::run(CommentServerConfig {
                api_key: args.api_key,
                comment_id: args.comment_id,
                api_endpoint: args.api_endpoint,
            })
            .await
        }
    }
}

fn load_config(args: &RunArgs) -> Result<RunConfig> {
    let job_url = match &args.job_url {
        Some(url) => url.clone(),
        None => {
            let run_id = args
                .run_id
                .as_deref()
                .context("Either --job-url or --run-id is required")?;
            RunConfig::job_url_for_run(&args.server_url, &args.repository, run_id)
        }
    };

    let relay_cmd = std::env::current_exe()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| "agent-relay".to_string());

    Ok(RunConfig {
        api_key: args.api_key.clone(),
        api_endpoint: args.api_endpoint.clone(),
        repository: args.repository.clone(),
        server_url: args.server_url.clone(),
        job_url,
        base_branch: args.base_branch.clone(),
        branch_prefix: args.branch_prefix.clone(),
        agent_cmd: args.agent_cmd.clone(),
        user_agent_args: args.agent_args.clone(),
        user_allowed_tools: args.allowed_tools.clone(),
        relay_cmd,
        git_user_name: args.git_user_name.clone(),
        git_user_email: args.git_user_email.clone(),
        git_token: args.git_token.clone(),
    })
}

fn read_event(path: &PathBuf) -> Result<DispatchEvent> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file {}", path.display()))?;
    serde_json::from_str(&raw).context("Failed to parse dispatch event")
}

async fn cmd_prepare(args: RunArgs) -> Result<()> {
    let config = load_config(&args)?;
    let event = read_event(&args.event_file)?;
    let result = prepare(&event, &config).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = load_config(&args)?;
    let event = read_event(&args.event_file)?;

    let result = prepare(&event, &config).await?;
    let success = execute_agent(&config, &result).await?;

    // Branch links only make sense when the agent actually committed.
    let branch_name = match branch_has_commits(
        &result.branch_info.working_branch,
        &result.branch_info.base_branch,
    )
    .await
    {
        Ok(true) => Some(result.branch_info.working_branch.clone()),
        Ok(false) => None,
        Err(e) => {
            warn!("could not inspect working branch: {e:#}");
            None
        }
    };

    if let Some(cleanup) = &result.tracker_cleanup {
        let outcome = RunOutcome {
            success,
            branch_name,
            base_branch: result.branch_info.base_branch.clone(),
            repository: config.repository.clone(),
            job_url: config.job_url.clone(),
            server_url: config.server_url.clone(),
        };
        // Best effort: a finalize failure is reported, not retried, and must
        // not mask the agent's own outcome.
        if let Err(e) = finalize_run(cleanup, &outcome, &config.api_endpoint).await {
            error!("failed to finalize tracking comment: {e}");
        }
    }

    if !success {
        anyhow::bail!("Agent process reported failure");
    }
    Ok(())
}

/// Spawns the agent with the prepared arguments, feeds it the prompt on
/// stdin, and waits for exit.
async fn execute_agent(config: &RunConfig, result: &PrepareResult) -> Result<bool> {
    info!(cmd = %config.agent_cmd, args = result.agent_args.len(), "spawning agent process");

    let mut child = tokio::process::Command::new(&config.agent_cmd)
        .args(&result.agent_args)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .context("Failed to spawn agent process")?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(result.prompt.as_bytes())
            .await
            .context("Failed to write prompt to agent stdin")?;
        stdin
            .shutdown()
            .await
            .context("Failed to close agent stdin")?;
    }

    let status = child.wait().await.context("Failed to wait for agent")?;
    let exit_code = status.code().unwrap_or(-1);
    info!(exit_code, "agent process exited");
    Ok(status.success())
}
