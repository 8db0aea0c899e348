//! JSON-RPC over stdio transport.
//!
//! Handles low-level communication with the tool server child process:
//! - Spawning the process with all three standard streams piped
//! - Writing one JSON request per line to stdin
//! - Framing stdout into messages and forwarding them to the dispatcher
//! - Relaying stderr to the log and watching for process exit
//!
//! The transport never interprets responses; correlation lives one layer up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot, Mutex};

use super::errors::McpError;
use super::framing::{Frame, InboundBuffer};
use super::types::{JsonRpcResponse, ServerConfig};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Size of a single stdout read.
const READ_CHUNK_SIZE: usize = 8 * 1024;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Messages decoded from the server's stdout, in arrival order.
pub type InboundMessages = mpsc::UnboundedReceiver<JsonRpcResponse>;

// ─── Transport ───────────────────────────────────────────────────────────────

/// Line-delimited JSON transport over a child process's stdio.
pub struct StdioTransport {
    server_name: String,
    writer: Mutex<Option<BoxedWriter>>,
    connected: Arc<AtomicBool>,
    /// Signals the exit watcher to kill the child. `None` once used, or when
    /// the transport was built from plain streams.
    kill_tx: std::sync::Mutex<Option<oneshot::Sender<()>>>,
}

impl StdioTransport {
    /// Spawn the server process and wire up its streams.
    ///
    /// Fails with `SpawnFailed` if the executable cannot be launched. The
    /// process is not restarted if it later exits.
    pub fn start(config: &ServerConfig) -> Result<(Self, InboundMessages), McpError> {
        let name = config.name.as_str();

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);
        for (key, value) in &config.env {
            cmd.env(key, value);
        }
        if let Some(dir) = config.cwd.as_deref() {
            cmd.current_dir(dir);
        }

        // Windows: prevent console window from appearing for child processes
        #[cfg(target_os = "windows")]
        {
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| McpError::SpawnFailed {
            name: name.to_string(),
            reason: format!("{}: {e}", config.command),
        })?;

        let stdin = child.stdin.take().ok_or(McpError::SpawnFailed {
            name: name.to_string(),
            reason: "failed to capture stdin".into(),
        })?;
        let stdout = child.stdout.take().ok_or(McpError::SpawnFailed {
            name: name.to_string(),
            reason: "failed to capture stdout".into(),
        })?;

        tracing::info!(
            server = name,
            command = %config.command,
            pid = child.id().unwrap_or_default(),
            "tool server spawned"
        );

        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_relay(name.to_string(), stderr);
        }

        let (mut transport, inbound) = Self::from_streams(name, stdin, stdout);

        let (kill_tx, kill_rx) = oneshot::channel();
        transport.kill_tx = std::sync::Mutex::new(Some(kill_tx));

        let connected = transport.connected.clone();
        let server = name.to_string();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    connected.store(false, Ordering::SeqCst);
                    match status {
                        Ok(s) if s.success() => {
                            tracing::info!(server = %server, "tool server exited");
                        }
                        Ok(s) => {
                            tracing::error!(server = %server, status = %s, "tool server exited with failure");
                        }
                        Err(e) => {
                            tracing::error!(server = %server, error = %e, "failed to wait on tool server");
                        }
                    }
                }
                _ = kill_rx => {
                    connected.store(false, Ordering::SeqCst);
                    if let Err(e) = child.kill().await {
                        tracing::warn!(server = %server, error = %e, "failed to kill tool server");
                    } else {
                        tracing::info!(server = %server, "tool server stopped");
                    }
                }
            }
        });

        Ok((transport, inbound))
    }

    /// Build a transport over arbitrary streams.
    ///
    /// `writer` plays the role of the server's stdin and `reader` its stdout.
    /// A background task frames `reader` and forwards every decoded message to
    /// the returned receiver; end-of-stream marks the transport disconnected.
    pub fn from_streams<W, R>(server_name: &str, writer: W, reader: R) -> (Self, InboundMessages)
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let connected = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::unbounded_channel();

        spawn_read_loop(server_name.to_string(), reader, tx, connected.clone());

        let transport = Self {
            server_name: server_name.to_string(),
            writer: Mutex::new(Some(Box::new(writer))),
            connected,
            kill_tx: std::sync::Mutex::new(None),
        };
        (transport, rx)
    }

    /// Write one message followed by a newline.
    ///
    /// Fails with `NotConnected` if the stream is closed or the write fails.
    /// A write abandoned midway (the caller's deadline fired) leaves a
    /// partial line on the pipe, so the transport is marked disconnected.
    pub async fn send(&self, payload: &str) -> Result<(), McpError> {
        if !self.is_connected() {
            return Err(self.not_connected());
        }

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or_else(|| self.not_connected())?;

        let mut line = String::with_capacity(payload.len() + 1);
        line.push_str(payload);
        line.push('\n');

        let mut in_flight = WriteInFlight {
            server: &self.server_name,
            connected: &self.connected,
            finished: false,
        };
        let result = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        }
        .await;
        in_flight.finished = true;

        result.map_err(|e| {
            self.connected.store(false, Ordering::SeqCst);
            tracing::warn!(server = %self.server_name, error = %e, "failed to write to tool server stdin");
            self.not_connected()
        })
    }

    /// Kill the server process and close stdin. Safe to call repeatedly.
    pub async fn stop(&self) {
        self.connected.store(false, Ordering::SeqCst);

        let kill_tx = self
            .kill_tx
            .lock()
            .map(|mut slot| slot.take())
            .unwrap_or_default();
        if let Some(tx) = kill_tx {
            let _ = tx.send(());
        }

        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }

    /// Whether the stream is still live (not stopped, not at EOF, not exited).
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    fn not_connected(&self) -> McpError {
        McpError::NotConnected {
            name: self.server_name.clone(),
        }
    }
}

/// Marks the transport disconnected if dropped before the write finished.
struct WriteInFlight<'a> {
    server: &'a str,
    connected: &'a AtomicBool,
    finished: bool,
}

impl Drop for WriteInFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.connected.store(false, Ordering::SeqCst);
            tracing::warn!(server = %self.server, "write to tool server abandoned midway");
        }
    }
}

// ─── Background Tasks ────────────────────────────────────────────────────────

/// Read stdout in chunks, frame it, and forward decoded messages.
fn spawn_read_loop<R>(
    server: String,
    mut reader: R,
    tx: mpsc::UnboundedSender<JsonRpcResponse>,
    connected: Arc<AtomicBool>,
) where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut inbound = InboundBuffer::new();
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        loop {
            let n = match reader.read(&mut chunk).await {
                Ok(0) => {
                    tracing::info!(server = %server, "tool server stdout closed");
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(server = %server, error = %e, "failed to read tool server stdout");
                    break;
                }
            };

            for frame in inbound.feed(&chunk[..n]) {
                match frame {
                    Frame::Message(message) => {
                        if tx.send(message).is_err() {
                            // Dispatcher is gone; nobody is listening anymore.
                            connected.store(false, Ordering::SeqCst);
                            return;
                        }
                    }
                    Frame::Malformed { line, reason } => {
                        let err = McpError::ParseError {
                            server: server.clone(),
                            reason,
                        };
                        tracing::warn!(
                            server = %server,
                            error = %err,
                            line = %truncate(&line, 200),
                            "dropping malformed line from tool server"
                        );
                    }
                }
            }
        }

        connected.store(false, Ordering::SeqCst);
    });
}

/// Relay each stderr line to the log. Never part of the protocol.
fn spawn_stderr_relay<R>(server: String, stderr: R)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if !line.trim().is_empty() => {
                    tracing::warn!(server = %server, stderr = %line, "tool server stderr");
                }
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(server = %server, error = %e, "stderr relay stopped");
                    break;
                }
            }
        }
    });
}

/// Truncate for log output without splitting a UTF-8 character.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_send_writes_newline_terminated_line() {
        let (client_io, server_io) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (transport, _inbound) = StdioTransport::from_streams("test", client_write, client_read);

        transport.send(r#"{"jsonrpc":"2.0","id":1}"#).await.unwrap();

        let mut lines = BufReader::new(server_io).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(line, r#"{"jsonrpc":"2.0","id":1}"#);
    }

    #[tokio::test]
    async fn test_inbound_messages_are_forwarded_and_garbage_dropped() {
        let (client_io, server_io) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (_transport, mut inbound) =
            StdioTransport::from_streams("test", client_write, client_read);

        let (_server_read, mut server_write) = tokio::io::split(server_io);
        server_write
            .write_all(b"not json\n{\"id\":7,\"res")
            .await
            .unwrap();
        server_write.write_all(b"ult\":{}}\n").await.unwrap();

        let message = inbound.recv().await.unwrap();
        assert_eq!(message.request_id(), Some(7));
    }

    #[tokio::test]
    async fn test_eof_marks_disconnected_and_send_fails() {
        let (client_io, server_io) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (transport, mut inbound) =
            StdioTransport::from_streams("test", client_write, client_read);
        assert!(transport.is_connected());

        drop(server_io);
        assert!(inbound.recv().await.is_none());
        assert!(!transport.is_connected());

        let err = transport.send("{}").await.unwrap_err();
        assert!(matches!(err, McpError::NotConnected { .. }));
    }

    #[tokio::test]
    async fn test_write_failure_is_not_connected() {
        // stdout stays open while stdin's reader is gone.
        let (stdin_io, stdin_peer) = tokio::io::duplex(1024);
        let (stdout_io, _stdout_peer) = tokio::io::duplex(1024);
        let (transport, _inbound) = StdioTransport::from_streams("test", stdin_io, stdout_io);
        drop(stdin_peer);

        let err = transport.send("{}").await.unwrap_err();
        assert!(matches!(err, McpError::NotConnected { .. }));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_abandoned_write_marks_disconnected() {
        // Nobody drains stdin, so a large line cannot be written in full.
        let (stdin_io, _stdin_peer) = tokio::io::duplex(64);
        let (stdout_io, _stdout_peer) = tokio::io::duplex(1024);
        let (transport, _inbound) = StdioTransport::from_streams("test", stdin_io, stdout_io);

        let payload = "x".repeat(4096);
        let elapsed =
            tokio::time::timeout(std::time::Duration::from_millis(50), transport.send(&payload))
                .await;
        assert!(elapsed.is_err());
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send("{}").await,
            Err(McpError::NotConnected { .. })
        ));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (client_io, _server_io) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (transport, _inbound) = StdioTransport::from_streams("test", client_write, client_read);

        transport.stop().await;
        transport.stop().await;
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send("{}").await,
            Err(McpError::NotConnected { .. })
        ));
    }

    #[tokio::test]
    async fn test_start_missing_executable_fails() {
        let config = ServerConfig {
            name: "ghost".into(),
            command: "definitely-not-a-real-binary-7f3a".into(),
            args: vec![],
            env: HashMap::new(),
            cwd: None,
        };
        match StdioTransport::start(&config) {
            Err(McpError::SpawnFailed { name, .. }) => assert_eq!(name, "ghost"),
            Err(other) => panic!("expected SpawnFailed, got {other:?}"),
            Ok(_) => panic!("expected SpawnFailed, got a transport"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_exit_marks_disconnected() {
        use std::time::Duration;

        let config = ServerConfig {
            name: "short-lived".into(),
            command: "sh".into(),
            args: vec!["-c".into(), "echo boom >&2; exit 3".into()],
            env: HashMap::new(),
            cwd: None,
        };
        let (transport, mut inbound) = StdioTransport::start(&config).unwrap();

        assert!(inbound.recv().await.is_none());
        tokio::time::timeout(Duration::from_secs(5), async {
            while transport.is_connected() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("transport should notice the exit");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        assert_eq!(truncate("İstanbul", 1), "");
        assert_eq!(truncate("İstanbul", 2), "İ");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
