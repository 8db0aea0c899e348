//! ConversationManager: in-memory conversation history per session.
//!
//! Responsibilities:
//! - Store and retrieve history entries keyed by session id
//! - Truncate each session to the most recent N entries
//!
//! History is process-local and lost on restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::types::{HistoryEntry, HistoryRole};

// ─── Constants ──────────────────────────────────────────────────────────────

/// Entries kept per session after truncation.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

// ─── ConversationManager ────────────────────────────────────────────────────

/// Session id → ordered history.
pub struct ConversationManager {
    sessions: Mutex<HashMap<String, Vec<HistoryEntry>>>,
    history_limit: usize,
}

impl Default for ConversationManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl ConversationManager {
    pub fn new(history_limit: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            history_limit,
        }
    }

    /// Append an entry, creating the session if needed.
    pub fn append(&self, session_id: &str, role: HistoryRole, content: &str) {
        self.lock()
            .entry(session_id.to_string())
            .or_default()
            .push(HistoryEntry {
                role,
                content: content.to_string(),
            });
    }

    /// A snapshot of the session's history (empty for unknown sessions).
    pub fn history(&self, session_id: &str) -> Vec<HistoryEntry> {
        self.lock().get(session_id).cloned().unwrap_or_default()
    }

    /// Drop the oldest entries beyond the limit. Returns how many were dropped.
    pub fn truncate(&self, session_id: &str) -> usize {
        let mut sessions = self.lock();
        let Some(history) = sessions.get_mut(session_id) else {
            return 0;
        };
        let excess = history.len().saturating_sub(self.history_limit);
        if excess > 0 {
            history.drain(..excess);
            tracing::debug!(session_id, dropped = excess, "truncated conversation history");
        }
        excess
    }

    /// Forget a session entirely. Returns whether it existed.
    pub fn clear(&self, session_id: &str) -> bool {
        self.lock().remove(session_id).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<HistoryEntry>>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_history() {
        let conv = ConversationManager::default();
        conv.append("s1", HistoryRole::User, "Selam");
        conv.append("s1", HistoryRole::Assistant, "Merhaba!");

        let history = conv.history("s1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], HistoryEntry::user("Selam"));
        assert_eq!(history[1], HistoryEntry::assistant("Merhaba!"));
        assert!(conv.history("unknown").is_empty());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let conv = ConversationManager::default();
        conv.append("a", HistoryRole::User, "one");
        conv.append("b", HistoryRole::User, "two");
        assert_eq!(conv.session_count(), 2);
        assert_eq!(conv.history("a")[0].content, "one");
        assert_eq!(conv.history("b")[0].content, "two");
    }

    #[test]
    fn test_truncate_keeps_most_recent() {
        let conv = ConversationManager::new(20);
        for i in 0..25 {
            conv.append("s", HistoryRole::User, &format!("msg {i}"));
        }
        assert_eq!(conv.truncate("s"), 5);

        let history = conv.history("s");
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].content, "msg 5");
        assert_eq!(history[19].content, "msg 24");

        assert_eq!(conv.truncate("s"), 0);
        assert_eq!(conv.truncate("missing"), 0);
    }

    #[test]
    fn test_clear() {
        let conv = ConversationManager::default();
        conv.append("s", HistoryRole::User, "x");
        assert!(conv.clear("s"));
        assert!(!conv.clear("s"));
        assert_eq!(conv.session_count(), 0);
    }
}
