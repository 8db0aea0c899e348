//! Assistant configuration loading.
//!
//! Reads `config/assistant.yaml` and resolves environment variables. Every
//! field has a default, so a missing file yields a working configuration
//! (given an API key in the environment).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::agent_core::conversation::DEFAULT_HISTORY_LIMIT;
use crate::agent_core::orchestrator::DEFAULT_MAX_ROUND_TRIPS;
use crate::agent_core::{LoopSettings, RetryPolicy};
use crate::inference::ModelConfig;
use crate::mcp_client::client::DEFAULT_CALL_TIMEOUT_MS;
use crate::mcp_client::ServerConfig;

/// Env var naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "WEATHER_ASSISTANT_CONFIG";

/// Config file location relative to a project directory.
const CONFIG_RELATIVE_PATH: &str = "config/assistant.yaml";

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config: {reason}")]
    Parse { reason: String },
}

// ─── Public Types ────────────────────────────────────────────────────────────

/// Top-level configuration (mirrors `config/assistant.yaml`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Agent loop and session tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model round-trips per turn, including the first.
    pub max_iterations: usize,
    /// Attempts per model call when rate limited.
    pub max_attempts: u32,
    pub initial_retry_delay_ms: u64,
    pub follow_up_retry_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Entries kept per session.
    pub history_limit: usize,
    /// Deadline for each tool server request.
    pub call_timeout_ms: u64,
    /// Deadline for the `initialize` handshake.
    pub init_timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ROUND_TRIPS,
            max_attempts: 3,
            initial_retry_delay_ms: 2_000,
            follow_up_retry_delay_ms: 6_000,
            backoff_multiplier: 1.5,
            history_limit: DEFAULT_HISTORY_LIMIT,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            init_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
        }
    }
}

impl AgentConfig {
    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            max_round_trips: self.max_iterations.max(1),
            initial_retry: RetryPolicy::new(
                self.max_attempts,
                Duration::from_millis(self.initial_retry_delay_ms),
                self.backoff_multiplier,
            ),
            follow_up_retry: RetryPolicy::new(
                self.max_attempts,
                Duration::from_millis(self.follow_up_retry_delay_ms),
                self.backoff_multiplier,
            ),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate the config file.
///
/// Checks `WEATHER_ASSISTANT_CONFIG` first, then searches upward from `start`
/// for `config/assistant.yaml`. Returns `None` when neither exists.
pub fn find_config_path(start: &Path) -> Option<PathBuf> {
    // 1. Check env var
    if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
        if !explicit.trim().is_empty() {
            return Some(PathBuf::from(expand_tilde(explicit.trim())));
        }
    }

    // 2. Walk upward from `start`
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_RELATIVE_PATH);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Load and parse a config file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_config(&raw)
}

/// Find and load the config, falling back to defaults when there is no file.
pub fn load_or_default(start: &Path) -> Result<(AppConfig, Option<PathBuf>), ConfigError> {
    match find_config_path(start) {
        Some(path) => {
            let config = load_config(&path)?;
            tracing::info!(path = %path.display(), "loaded assistant config");
            Ok((config, Some(path)))
        }
        None => {
            tracing::info!("no config file found, using defaults");
            Ok((AppConfig::default(), None))
        }
    }
}

/// Parse YAML config text.
///
/// Performs environment-variable interpolation on `${VAR_NAME}` and
/// `${VAR_NAME:-default}` before parsing.
pub fn parse_config(raw: &str) -> Result<AppConfig, ConfigError> {
    let interpolated = interpolate_env_vars(raw);

    // An empty (or comment-only) file is a valid all-defaults config.
    if interpolated
        .lines()
        .all(|l| l.trim().is_empty() || l.trim_start().starts_with('#'))
    {
        return Ok(AppConfig::default());
    }

    let mut config: AppConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;

    if let Some(cwd) = config.server.cwd.as_deref() {
        config.server.cwd = Some(expand_tilde(cwd));
    }
    Ok(config)
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve `VAR` or `VAR:-default`. Unset and empty both take the default.
fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((var_name, default)) => std::env::var(var_name)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| expand_tilde(default)),
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_env_vars_with_default() {
        std::env::remove_var("__WA_TEST_UNSET_VAR__");
        let result = interpolate_env_vars("${__WA_TEST_UNSET_VAR__:-/fallback/path}");
        assert_eq!(result, "/fallback/path");
    }

    #[test]
    fn test_interpolate_env_vars_with_value() {
        std::env::set_var("__WA_TEST_SET_VAR__", "python3");
        let result = interpolate_env_vars("command: ${__WA_TEST_SET_VAR__:-python}");
        assert_eq!(result, "command: python3");
        std::env::remove_var("__WA_TEST_SET_VAR__");
    }

    #[test]
    fn test_interpolate_missing_var_without_default_is_empty() {
        std::env::remove_var("__WA_TEST_MISSING_VAR__");
        assert_eq!(interpolate_env_vars("key: '${__WA_TEST_MISSING_VAR__}'"), "key: ''");
    }

    #[test]
    fn test_interpolate_no_vars() {
        let input = "plain text with $dollar but no braces";
        assert_eq!(interpolate_env_vars(input), input);
    }

    #[test]
    fn test_expand_tilde() {
        let result = expand_tilde("~/weather");
        assert!(!result.starts_with('~'), "tilde should be expanded");
        assert!(result.ends_with("/weather"));
        assert_eq!(expand_tilde("/abs/path"), "/abs/path");
    }

    #[test]
    fn test_empty_config_is_all_defaults() {
        let config = parse_config("# nothing here\n\n").unwrap();
        assert_eq!(config.model.model_name, "gemini-2.5-flash");
        assert_eq!(config.server.command, "python");
        assert_eq!(config.server.args, vec!["mcp-server/server.py"]);
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.agent.history_limit, 20);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let yaml = r#"
model:
  model_name: gemini-2.0-flash
agent:
  history_limit: 10
  follow_up_retry_delay_ms: 3000
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.model.model_name, "gemini-2.0-flash");
        assert_eq!(config.model.request_timeout_secs, 60);
        assert_eq!(config.agent.history_limit, 10);
        assert_eq!(config.agent.max_attempts, 3);

        let settings = config.agent.loop_settings();
        assert_eq!(settings.follow_up_retry.base_delay, Duration::from_secs(3));
        assert_eq!(settings.initial_retry.base_delay, Duration::from_secs(2));
        assert_eq!(settings.max_round_trips, 5);
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = parse_config("agent: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assistant.yaml");
        std::fs::write(
            &path,
            "server:\n  command: python3\n  args: [server.py]\n  cwd: ~/weather\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.command, "python3");
        assert_eq!(config.server.args, vec!["server.py"]);
        assert!(!config.server.cwd.unwrap().starts_with('~'));
    }

    #[test]
    fn test_load_config_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_find_config_path_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::write(dir.path().join(CONFIG_RELATIVE_PATH), "").unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        // Only meaningful when the env override is not set in the test environment.
        if std::env::var(CONFIG_PATH_ENV).is_err() {
            let found = find_config_path(&nested).unwrap();
            assert_eq!(found, dir.path().join(CONFIG_RELATIVE_PATH));
        }
    }

    #[test]
    fn test_agent_timeouts() {
        let agent = AgentConfig::default();
        assert_eq!(agent.call_timeout(), Duration::from_secs(30));
        assert_eq!(agent.init_timeout(), Duration::from_secs(30));
    }
}
