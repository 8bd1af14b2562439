//! CLI entry point parsing and environment-variable overrides.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "harness-mux")]
#[command(about = "Terminal-multiplexing runtime hosting concurrent agent/shell threads")]
#[command(version)]
pub struct Cli {
    #[arg(long)]
    pub recording_path: Option<PathBuf>,

    #[arg(long)]
    pub recording_gif_output: Option<PathBuf>,

    #[arg(long, default_value_t = 15)]
    pub recording_fps: u32,

    #[arg(long, default_value = "127.0.0.1")]
    pub control_plane_host: String,

    #[arg(long, default_value_t = 7890)]
    pub control_plane_port: u16,

    #[arg(long)]
    pub control_plane_auth_token: Option<String>,

    #[arg(long)]
    pub scope: Option<String>,

    /// Passthrough agent args, forwarded verbatim to the launched agent.
    #[arg(trailing_var_arg = true)]
    pub agent_args: Vec<String>,
}

/// Scope split out of `--scope tenantId,userId,workspaceId,worktreeId?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeArg {
    pub tenant_id: String,
    pub user_id: String,
    pub workspace_id: String,
    pub worktree_id: Option<String>,
}

impl ScopeArg {
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split(',').collect();
        if parts.len() < 3 {
            return None;
        }
        Some(Self {
            tenant_id: parts[0].to_string(),
            user_id: parts[1].to_string(),
            workspace_id: parts[2].to_string(),
            worktree_id: parts.get(3).map(|s| s.to_string()),
        })
    }
}

/// `HARNESS_*` environment overrides.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub invoke_cwd: Option<PathBuf>,
    pub session_name: Option<String>,
    pub term_fg: Option<String>,
    pub term_bg: Option<String>,
    pub perf_enabled: bool,
    pub perf_file_path: Option<PathBuf>,
    pub background_resume: bool,
    pub background_probes: bool,
    pub control_plane_connect_retry_window_ms: u64,
    pub control_plane_connect_retry_delay_ms: u64,
}

fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl EnvOverrides {
    pub fn load() -> Self {
        Self {
            invoke_cwd: std::env::var("HARNESS_INVOKE_CWD").ok().map(PathBuf::from),
            session_name: std::env::var("HARNESS_SESSION_NAME").ok(),
            term_fg: std::env::var("HARNESS_TERM_FG").ok(),
            term_bg: std::env::var("HARNESS_TERM_BG").ok(),
            perf_enabled: env_bool("HARNESS_PERF_ENABLED"),
            perf_file_path: std::env::var("HARNESS_PERF_FILE_PATH").ok().map(PathBuf::from),
            background_resume: env_bool("HARNESS_MUX_BACKGROUND_RESUME"),
            background_probes: env_bool("HARNESS_MUX_BACKGROUND_PROBES"),
            control_plane_connect_retry_window_ms: env_u64(
                "HARNESS_CONTROL_PLANE_CONNECT_RETRY_WINDOW_MS",
                0,
            ),
            control_plane_connect_retry_delay_ms: env_u64(
                "HARNESS_CONTROL_PLANE_CONNECT_RETRY_DELAY_MS",
                1,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_parses_four_part_value() {
        let scope = ScopeArg::parse("t,u,w,wt").unwrap();
        assert_eq!(scope.worktree_id, Some("wt".to_string()));
    }

    #[test]
    fn scope_without_worktree_parses_optional_as_none() {
        let scope = ScopeArg::parse("t,u,w").unwrap();
        assert_eq!(scope.worktree_id, None);
    }

    #[test]
    fn scope_with_too_few_parts_is_rejected() {
        assert!(ScopeArg::parse("t,u").is_none());
    }

    #[test]
    fn cli_parses_minimal_invocation() {
        let cli = Cli::parse_from(["harness-mux"]);
        assert_eq!(cli.control_plane_port, 7890);
        assert_eq!(cli.recording_fps, 15);
    }

    #[test]
    fn cli_parses_passthrough_agent_args() {
        let cli = Cli::parse_from(["harness-mux", "--", "--resume", "abc"]);
        assert_eq!(cli.agent_args, vec!["--resume".to_string(), "abc".to_string()]);
    }
}
