//! Agent invocation arguments: the tool allow-list and the embedded MCP
//! configuration blob this core contributes to the agent CLI.

use anyhow::{Context, Result};
use serde_json::json;

use crate::config::RunConfig;

/// Name of the tracking-comment update tool exposed by the comment server.
pub const COMMENT_UPDATE_TOOL: &str = "mcp__tracker_comment__update_tracking_comment";

/// Tools every relay-triggered run may use.
pub const BUILTIN_ALLOWED_TOOLS: &[&str] = &[
    "Edit",
    "MultiEdit",
    "Glob",
    "Grep",
    "LS",
    "Read",
    "Write",
    COMMENT_UPDATE_TOOL,
    "Bash(git add *)",
    "Bash(git commit *)",
    "Bash(git push *)",
    "Bash(git status *)",
    "Bash(git diff *)",
    "Bash(git log *)",
    "Bash(git rm *)",
];

/// Merges the built-in allow-list with the externally supplied one.
/// Duplicates are dropped; order is stable on first occurrence.
pub fn merge_allowed_tools(user_tools: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    BUILTIN_ALLOWED_TOOLS
        .iter()
        .map(|tool| tool.to_string())
        .chain(user_tools.iter().cloned())
        .filter(|tool| seen.insert(tool.clone()))
        .collect()
}

/// MCP configuration blob wiring the comment server into the agent. The
/// credential and comment id travel via the server's environment, not its
/// argv.
fn mcp_config(config: &RunConfig, comment_id: &str) -> serde_json::Value {
    json!({
        "mcpServers": {
            "tracker_comment": {
                "command": config.relay_cmd,
                "args": ["comment-server"],
                "env": {
                    "TRACKER_API_KEY": config.api_key,
                    "TRACKER_COMMENT_ID": comment_id,
                    "TRACKER_API_ENDPOINT": config.api_endpoint,
                }
            }
        }
    })
}

/// Arguments this core contributes to the agent CLI: the MCP configuration,
/// the serialized allow-list, then any user-supplied arguments verbatim.
pub fn build_agent_args(
    config: &RunConfig,
    comment_id: &str,
    allowed_tools: &[String],
) -> Result<Vec<String>> {
    let mcp = serde_json::to_string(&mcp_config(config, comment_id))
        .context("Failed to serialize MCP configuration")?;

    let mut args = vec![
        "--mcp-config".to_string(),
        mcp,
        "--allowedTools".to_string(),
        allowed_tools.join(","),
    ];

    if !config.user_agent_args.trim().is_empty() {
        let extra = shell_words::split(&config.user_agent_args)
            .context("Failed to parse extra agent arguments")?;
        args.extend(extra);
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── merge_allowed_tools ──────────────────────────────────────────

    #[test]
    fn test_merge_with_no_user_tools_is_builtins() {
        let merged = merge_allowed_tools(&[]);
        assert_eq!(merged.len(), BUILTIN_ALLOWED_TOOLS.len());
        assert_eq!(merged[0], "Edit");
        assert!(merged.contains(&COMMENT_UPDATE_TOOL.to_string()));
    }

    #[test]
    fn test_merge_appends_user_tools_after_builtins() {
        let merged = merge_allowed_tools(&["mcp__extra__tool".to_string()]);
        assert_eq!(merged.last().unwrap(), "mcp__extra__tool");
    }

    #[test]
    fn test_merge_dedupes_keeping_first_occurrence() {
        let merged = merge_allowed_tools(&[
            "Read".to_string(),
            "mcp__extra__tool".to_string(),
            "mcp__extra__tool".to_string(),
        ]);
        assert_eq!(
            merged.iter().filter(|t| t.as_str() == "Read").count(),
            1
        );
        assert_eq!(
            merged
                .iter()
                .filter(|t| t.as_str() == "mcp__extra__tool")
                .count(),
            1
        );
        // "Read" keeps its built-in position, not the user position.
        let read_pos = merged.iter().position(|t| t == "Read").unwrap();
        assert!(read_pos < BUILTIN_ALLOWED_TOOLS.len());
    }

    // ── build_agent_args ─────────────────────────────────────────────

    #[test]
    fn test_agent_args_carry_mcp_config_and_allowlist() {
        let config = RunConfig::for_tests();
        let allowed = merge_allowed_tools(&[]);
        let args = build_agent_args(&config, "lc-uuid-1", &allowed).unwrap();

        assert_eq!(args[0], "--mcp-config");
        let mcp: serde_json::Value = serde_json::from_str(&args[1]).unwrap();
        assert_eq!(
            mcp["mcpServers"]["tracker_comment"]["env"]["TRACKER_COMMENT_ID"],
            "lc-uuid-1"
        );
        assert_eq!(
            mcp["mcpServers"]["tracker_comment"]["args"][0],
            "comment-server"
        );
        assert_eq!(args[2], "--allowedTools");
        assert!(args[3].contains("Edit,"));
        assert!(args[3].contains(COMMENT_UPDATE_TOOL));
    }

    #[test]
    fn test_user_agent_args_are_tokenized_and_appended() {
        let mut config = RunConfig::for_tests();
        config.user_agent_args = "--model opus --note 'two words'".to_string();
        let args = build_agent_args(&config, "lc-1", &merge_allowed_tools(&[])).unwrap();

        let tail: Vec<_> = args[args.len() - 4..].to_vec();
        assert_eq!(tail, vec!["--model", "opus", "--note", "two words"]);
    }

    #[test]
    fn test_unbalanced_quotes_in_user_args_fail() {
        let mut config = RunConfig::for_tests();
        config.user_agent_args = "--note 'unterminated".to_string();
        assert!(build_agent_args(&config, "lc-1", &[]).is_err());
    }
}
