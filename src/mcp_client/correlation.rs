//! Request/response correlation.
//!
//! Every outgoing request gets an id from a per-client counter and a oneshot
//! channel parked in the pending map. The dispatcher task hands each inbound
//! message to [`CorrelationTable::deliver`], which settles the waiter whose id
//! matches. Because lookup is by id, any number of calls can be in flight on
//! one connection and responses may come back in any order.
//!
//! Each waiter is settled at most once: whoever removes the entry from the map
//! (a delivered response, a timeout via [`CorrelationTable::cancel`], or
//! [`CorrelationTable::clear`]) owns it. Late responses find nothing and are
//! dropped. A caller whose future is dropped mid-request releases its entry
//! through [`PendingGuard`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::oneshot;

use super::errors::McpError;
use super::types::JsonRpcResponse;

/// Outcome handed to the caller awaiting a response.
pub type CallOutcome = Result<Value, McpError>;

type Waiter = oneshot::Sender<CallOutcome>;

/// Pending requests keyed by JSON-RPC id.
pub struct CorrelationTable {
    server_name: String,
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, Waiter>>,
}

impl CorrelationTable {
    pub fn new(server_name: &str) -> Self {
        Self {
            server_name: server_name.to_string(),
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate the next id and park a waiter for it.
    pub fn register(&self) -> (u64, oneshot::Receiver<CallOutcome>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id, tx);
        (id, rx)
    }

    /// Route an inbound message to its waiter.
    ///
    /// Returns `true` if a waiter was settled. Messages without a numeric id
    /// (notifications) or with an id nobody is waiting for are ignored.
    pub fn deliver(&self, message: JsonRpcResponse) -> bool {
        let Some(id) = message.request_id() else {
            tracing::debug!(server = %self.server_name, "ignoring message without request id");
            return false;
        };

        let Some(waiter) = self.lock().remove(&id) else {
            tracing::debug!(
                server = %self.server_name,
                id,
                "ignoring response for unknown or expired request"
            );
            return false;
        };

        waiter.send(outcome_of(message)).is_ok()
    }

    /// Drop the waiter for `id` (used when the caller's deadline fires).
    pub fn cancel(&self, id: u64) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Tie the entry for `id` to the caller's scope.
    pub fn guard(&self, id: u64) -> PendingGuard<'_> {
        PendingGuard { table: self, id }
    }

    /// Drop every waiter without settling it. Returns how many were pending.
    pub fn clear(&self) -> usize {
        let mut pending = self.lock();
        let count = pending.len();
        pending.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Waiter>> {
        // The map holds no invariants a panicking holder could break.
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Removes its entry from the table when dropped.
///
/// Held by the caller for the lifetime of a request, so an abandoned call
/// (aborted task, losing `select!` branch) does not leave a waiter behind.
/// Removing an entry that was already settled is a no-op.
pub struct PendingGuard<'a> {
    table: &'a CorrelationTable,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.table.cancel(self.id) {
            tracing::debug!(
                server = %self.table.server_name,
                id = self.id,
                "released abandoned request"
            );
        }
    }
}

/// Convert a response into the caller's outcome: `error` wins over `result`,
/// and a response carrying neither resolves to `null`.
fn outcome_of(message: JsonRpcResponse) -> CallOutcome {
    if let Some(err) = message.error {
        let message = if err.message.is_empty() {
            "MCP request failed".to_string()
        } else {
            err.message
        };
        return Err(McpError::ServerError {
            code: err.code,
            message,
            data: err.data,
        });
    }
    Ok(message.result.unwrap_or(Value::Null))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> JsonRpcResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_register_allocates_distinct_increasing_ids() {
        let table = CorrelationTable::new("weather");
        let (a, _rx_a) = table.register();
        let (b, _rx_b) = table.register();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn test_deliver_out_of_order() {
        let table = CorrelationTable::new("weather");
        let (first, rx_first) = table.register();
        let (second, rx_second) = table.register();

        assert!(table.deliver(response(&format!(
            r#"{{"jsonrpc":"2.0","id":{second},"result":{{"which":"second"}}}}"#
        ))));
        assert!(table.deliver(response(&format!(
            r#"{{"jsonrpc":"2.0","id":{first},"result":{{"which":"first"}}}}"#
        ))));

        assert_eq!(rx_first.await.unwrap().unwrap()["which"], "first");
        assert_eq!(rx_second.await.unwrap().unwrap()["which"], "second");
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_deliver_error_response() {
        let table = CorrelationTable::new("weather");
        let (id, rx) = table.register();
        table.deliver(response(&format!(
            r#"{{"id":{id},"error":{{"code":-32601,"message":"Method not found"}}}}"#
        )));

        match rx.await.unwrap() {
            Err(McpError::ServerError { code, message, .. }) => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            other => panic!("expected ServerError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deliver_empty_error_message_gets_default() {
        let table = CorrelationTable::new("weather");
        let (id, rx) = table.register();
        table.deliver(response(&format!(r#"{{"id":{id},"error":{{}}}}"#)));
        let err = rx.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("MCP request failed"));
    }

    #[tokio::test]
    async fn test_deliver_missing_result_is_null() {
        let table = CorrelationTable::new("weather");
        let (id, rx) = table.register();
        table.deliver(response(&format!(r#"{{"id":{id}}}"#)));
        assert!(rx.await.unwrap().unwrap().is_null());
    }

    #[test]
    fn test_unknown_and_absent_ids_are_ignored() {
        let table = CorrelationTable::new("weather");
        let (_id, _rx) = table.register();
        assert!(!table.deliver(response(r#"{"id":99,"result":{}}"#)));
        assert!(!table.deliver(response(r#"{"method":"notifications/message"}"#)));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_late_response_after_cancel_is_dropped() {
        let table = CorrelationTable::new("weather");
        let (id, rx) = table.register();
        assert!(table.cancel(id));

        // Sender was dropped by cancel, so the receiver sees a closed channel.
        assert!(rx.await.is_err());

        assert!(!table.deliver(response(&format!(r#"{{"id":{id},"result":{{}}}}"#))));
        assert!(table.is_empty());
    }

    #[test]
    fn test_guard_releases_entry_on_drop() {
        let table = CorrelationTable::new("weather");
        let (id, rx) = table.register();
        let (_kept, _rx_kept) = table.register();
        {
            let _guard = table.guard(id);
            assert_eq!(table.len(), 2);
        }
        assert_eq!(table.len(), 1);
        drop(rx);
    }

    #[tokio::test]
    async fn test_guard_after_delivery_is_harmless() {
        let table = CorrelationTable::new("weather");
        let (id, rx) = table.register();
        let guard = table.guard(id);
        assert!(table.deliver(response(&format!(r#"{{"id":{id},"result":{{}}}}"#))));
        drop(guard);
        assert!(rx.await.unwrap().is_ok());
        assert!(table.is_empty());
    }

    #[test]
    fn test_clear_drops_all_waiters() {
        let table = CorrelationTable::new("weather");
        let (_a, _rx_a) = table.register();
        let (_b, _rx_b) = table.register();
        assert_eq!(table.clear(), 2);
        assert!(table.is_empty());

        // Ids keep increasing across clears.
        let (c, _rx_c) = table.register();
        assert_eq!(c, 3);
    }
}
