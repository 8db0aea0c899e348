//! Structured weather lookups that bypass the model.
//!
//! These call the tool server directly so a UI can render current
//! conditions and the forecast without a chat turn.

use serde_json::{json, Value};

use crate::agent_core::ToolProvider;
use crate::mcp_client::McpError;
use crate::AppState;

use super::CommandError;

const WEATHER_TOOL: &str = "get_weather";
const FORECAST_TOOL: &str = "get_weather_forecast";

/// Current conditions for `city`.
pub async fn weather_data<M, T: ToolProvider>(
    state: &AppState<M, T>,
    city: &str,
) -> Result<Value, CommandError> {
    call_city_tool(state.tools(), WEATHER_TOOL, city).await
}

/// The coming days' forecast for `city`.
pub async fn weather_forecast<M, T: ToolProvider>(
    state: &AppState<M, T>,
    city: &str,
) -> Result<Value, CommandError> {
    call_city_tool(state.tools(), FORECAST_TOOL, city).await
}

async fn call_city_tool<T: ToolProvider>(
    tools: &T,
    tool: &str,
    city: &str,
) -> Result<Value, CommandError> {
    let city = city.trim();
    if city.is_empty() {
        return Err(CommandError::bad_request("City parameter is required"));
    }

    if !tools.is_connected() {
        tracing::error!(tool, "tool server not connected");
        return Err(McpError::NotConnected {
            name: "weather".into(),
        }
        .into());
    }

    tracing::info!(tool, city, "fetching weather data");
    let result = tools
        .call_tool(tool, json!({ "city": city }))
        .await
        .map_err(|e| {
            tracing::error!(tool, city, error = %e, "weather tool call failed");
            CommandError::from(e)
        })?;

    // Tools report upstream failures in-band.
    if let Some(err) = result.get("error").filter(|e| !e.is_null()) {
        let message = match err {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        tracing::error!(tool, city, error = %message, "weather tool returned an error");
        return Err(CommandError::internal(message));
    }

    Ok(result)
}
