//! Liveness report.

use serde::Serialize;

use crate::agent_core::ToolProvider;
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    #[serde(rename = "mcpConnected")]
    pub mcp_connected: bool,
}

/// The service is up whenever this answers; the tool server may not be.
pub fn health<M, T: ToolProvider>(state: &AppState<M, T>) -> HealthStatus {
    HealthStatus {
        status: "ok",
        mcp_connected: state.tools().is_connected(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_core::test_support::{FakeModel, FakeTools};
    use crate::agent_core::{ConversationManager, LoopSettings, Orchestrator};
    use serde_json::json;

    fn state(tools: FakeTools) -> AppState<FakeModel, FakeTools> {
        AppState::new(
            Orchestrator::new(FakeModel::new(vec![]), tools, LoopSettings::default()),
            ConversationManager::default(),
        )
    }

    #[test]
    fn test_health_reports_connection() {
        let up = health(&state(FakeTools::weather()));
        assert_eq!(
            serde_json::to_value(&up).unwrap(),
            json!({"status": "ok", "mcpConnected": true})
        );

        let down = health(&state(FakeTools {
            disconnected: true,
            ..FakeTools::default()
        }));
        assert_eq!(down.status, "ok");
        assert!(!down.mcp_connected);
    }
}
