//! Line framing for the server's stdout stream.
//!
//! The server writes one JSON object per `\n`-terminated line, but pipe reads
//! deliver arbitrary chunks. [`split_lines`] is the pure core: given the held
//! tail and a new chunk it returns the new tail and every complete line.
//! [`InboundBuffer`] wraps it with JSON parsing for the transport read loop.

use super::types::JsonRpcResponse;

// ─── Pure Splitting ──────────────────────────────────────────────────────────

/// Append `chunk` to `pending` and cut out every complete line.
///
/// Returns `(remaining, lines)`. `remaining` holds at most one incomplete
/// line. Lines are returned without their terminator (a trailing `\r` is
/// stripped too). Works on bytes so a multi-byte UTF-8 character split across
/// two reads is reassembled before decoding.
pub fn split_lines(pending: &[u8], chunk: &[u8]) -> (Vec<u8>, Vec<Vec<u8>>) {
    let mut buf = Vec::with_capacity(pending.len() + chunk.len());
    buf.extend_from_slice(pending);
    buf.extend_from_slice(chunk);

    let mut lines = Vec::new();
    let mut start = 0;
    while let Some(offset) = buf[start..].iter().position(|&b| b == b'\n') {
        let end = start + offset;
        let mut line = &buf[start..end];
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }
        lines.push(line.to_vec());
        start = end + 1;
    }

    (buf[start..].to_vec(), lines)
}

// ─── Inbound Buffer ──────────────────────────────────────────────────────────

/// Outcome of decoding one complete line.
#[derive(Debug)]
pub enum Frame {
    /// A well-formed JSON-RPC message.
    Message(JsonRpcResponse),
    /// A line that was not valid JSON. Carries the raw text and parser error.
    Malformed { line: String, reason: String },
}

/// Accumulates stdout bytes and yields decoded frames.
#[derive(Debug, Default)]
pub struct InboundBuffer {
    pending: Vec<u8>,
}

impl InboundBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and decode every line it completes. Blank lines are skipped.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let (remaining, lines) = split_lines(&self.pending, chunk);
        self.pending = remaining;

        lines
            .into_iter()
            .filter_map(|raw| {
                let text = String::from_utf8_lossy(&raw);
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                Some(parse_frame(trimmed))
            })
            .collect()
    }

    /// Bytes currently held back as an incomplete line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn parse_frame(line: &str) -> Frame {
    match serde_json::from_str::<JsonRpcResponse>(line) {
        Ok(message) => Frame::Message(message),
        Err(e) => Frame::Malformed {
            line: line.to_string(),
            reason: e.to_string(),
        },
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
