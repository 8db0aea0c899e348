//! Interactive weather assistant.
//!
//! Reads one message per stdin line and prints the assistant's reply.
//! `/reset` starts the conversation over; EOF or Ctrl-C quits.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use weather_assistant::commands::chat::{reset_session, send_message, ChatReply};
use weather_assistant::config::load_or_default;
use weather_assistant::{init_tracing, AppState};

const RESET_COMMAND: &str = "/reset";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_file = init_tracing();

    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    let (mut config, config_path) = load_or_default(&cwd).context("failed to load config")?;
    if let Some(path) = &config_path {
        eprintln!("config: {}", path.display());
        // Relative server args resolve against the project root (parent of `config/`).
        if config.server.cwd.is_none() {
            config.server.cwd = path
                .parent()
                .and_then(|dir| dir.parent())
                .map(|root| root.display().to_string());
        }
    }
    if let Some(path) = &log_file {
        eprintln!("log: {}", path.display());
    }

    let state = AppState::start(&config)
        .await
        .context("failed to start weather assistant")?;

    let session_id = Uuid::new_v4().to_string();
    tracing::info!(session_id = %session_id, "interactive session started");
    eprintln!("Hava durumu asistanı hazır. Çıkmak için Ctrl-D, sıfırlamak için {RESET_COMMAND}.");

    let result = tokio::select! {
        result = run_repl(&state, &session_id) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
            Ok(())
        }
    };
    state.shutdown().await;
    result
}

async fn run_repl(state: &AppState, session_id: &str) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            return Ok(());
        };

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == RESET_COMMAND {
            reset_session(state, session_id);
            println!("(sohbet sıfırlandı)");
            continue;
        }

        match send_message(state, session_id, message).await {
            Ok(reply) => print_reply(&reply),
            Err(e) => eprintln!("error: {e}"),
        }
    }
}

fn print_reply(reply: &ChatReply) {
    println!("{}", reply.content);
    if !reply.tool_calls.is_empty() {
        let names: Vec<&str> = reply.tool_calls.iter().map(|c| c.name.as_str()).collect();
        println!("[tools: {}]", names.join(", "));
    }
    println!();
}
