pub mod agent_core;
pub mod commands;
pub mod config;
pub mod inference;
pub mod mcp_client;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use agent_core::{ConversationManager, Orchestrator};
use config::AppConfig;
use inference::{GeminiClient, InferenceError};
use mcp_client::{McpClient, McpError};

/// Env var that redirects logs from the log file to stderr: `1` for text,
/// `json` for JSON lines.
pub const LOG_STDERR_ENV: &str = "WEATHER_ASSISTANT_LOG_STDERR";

/// Log file name inside the data directory.
const LOG_FILE_NAME: &str = "assistant.log";

/// Rotated log files kept besides the live one.
const LOG_KEEP: u32 = 3;

// ─── App State ──────────────────────────────────────────────────────────────

/// Errors that abort service startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("model client: {0}")]
    Model(#[from] InferenceError),

    #[error("tool server: {0}")]
    ToolServer(#[from] McpError),
}

/// Shared state behind every command.
///
/// Generic over the model and tool seams so commands can run against
/// in-memory fakes; production uses the defaults.
pub struct AppState<M = GeminiClient, T = Arc<McpClient>> {
    pub orchestrator: Orchestrator<M, T>,
    pub conversations: ConversationManager,
}

impl<M, T> AppState<M, T> {
    pub fn new(orchestrator: Orchestrator<M, T>, conversations: ConversationManager) -> Self {
        Self {
            orchestrator,
            conversations,
        }
    }

    pub fn tools(&self) -> &T {
        self.orchestrator.tools()
    }
}

impl AppState {
    /// Build the model client, connect the tool server, and create the
    /// session store. Any failure is fatal.
    pub async fn start(config: &AppConfig) -> Result<Self, StartupError> {
        let model = GeminiClient::from_config(&config.model)?;
        tracing::info!(model = model.model_name(), "model client ready");

        let agent = &config.agent;
        let client =
            McpClient::connect(&config.server, agent.init_timeout(), agent.call_timeout()).await?;

        let conversations = ConversationManager::new(agent.history_limit);
        let orchestrator = Orchestrator::new(model, Arc::new(client), agent.loop_settings());
        tracing::info!(
            max_round_trips = orchestrator.settings().max_round_trips,
            history_limit = conversations.history_limit(),
            "assistant started"
        );

        Ok(Self::new(orchestrator, conversations))
    }

    /// Stop the tool server. In-flight calls fail with `NotConnected`.
    pub async fn shutdown(&self) {
        tracing::info!(sessions = self.conversations.session_count(), "shutting down");
        self.tools().disconnect().await;
    }
}

// ─── Data directory & logging ───────────────────────────────────────────────

/// Platform data directory for the assistant (logs live here).
///
/// Falls back to `~/.weather-assistant/` when the platform directory cannot
/// be resolved.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("weather-assistant");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".weather-assistant")
}

/// Initialize the tracing subscriber.
///
/// On each startup:
/// 1. Rotates existing logs (assistant.log → .1 → .2 → .3, keeps last 3).
/// 2. Opens a fresh assistant.log with a line-flushing writer.
///
/// Setting `WEATHER_ASSISTANT_LOG_STDERR` sends logs to stderr instead, and
/// so does a log file that cannot be opened. Returns the log file path when
/// logging to a file.
pub fn init_tracing() -> Option<PathBuf> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("weather_assistant=info,warn"));

    let stderr_mode = std::env::var(LOG_STDERR_ENV).unwrap_or_default();
    let log_path = if stderr_mode.is_empty() {
        open_log_file(&data_dir())
    } else {
        None
    };

    match log_path {
        Some((path, writer)) => {
            fmt::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .init();

            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                log_file = %path.display(),
                pid = std::process::id(),
                "=== Weather Assistant starting ==="
            );
            Some(path)
        }
        None if stderr_mode.eq_ignore_ascii_case("json") => {
            fmt::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
        None => {
            fmt::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .init();
            None
        }
    }
}

/// Rotate and open the log file. `None` if the directory or file is unusable.
fn open_log_file(log_dir: &Path) -> Option<(PathBuf, FlushingWriter)> {
    std::fs::create_dir_all(log_dir).ok()?;
    let log_path = log_dir.join(LOG_FILE_NAME);
    rotate_log_file(&log_path, LOG_KEEP);

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok()?;
    Some((log_path, FlushingWriter::new(file)))
}

/// Rotate log files: `assistant.log` → `.1` → `.2` → … → `.{keep}`.
///
/// Oldest file beyond `keep` is deleted. Missing files in the chain are skipped.
fn rotate_log_file(base_path: &Path, keep: u32) {
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A file writer that flushes after every write, so log lines survive a crash.
#[derive(Clone)]
struct FlushingWriter {
    file: Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
