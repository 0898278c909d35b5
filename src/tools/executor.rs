//! Execution of completed tool invocations.

use tracing::debug;

use crate::types::ToolCall;

use super::accumulator::PendingCall;
use super::ToolRegistry;

/// Execute a completed invocation against the registry.
///
/// Always yields a result payload: an unknown tool name produces an explicit
/// "not implemented" marker, an unparseable argument buffer produces the
/// parse error text, and a handler failure produces its message. The turn is
/// never aborted at this scope.
pub async fn execute(pending: PendingCall, registry: &ToolRegistry) -> (ToolCall, serde_json::Value) {
    let call = ToolCall {
        id: pending.id,
        name: pending.name,
        arguments: pending.arguments,
    };

    let arguments = match serde_json::from_str::<serde_json::Value>(&call.arguments) {
        Ok(value) => value,
        Err(err) => {
            debug!(tool = %call.name, error = %err, "tool arguments failed to parse");
            return (
                call,
                serde_json::json!({ "error": format!("invalid tool arguments: {err}") }),
            );
        }
    };

    let result = match registry.get(&call.name) {
        Some(tool) => match tool.execute(arguments).await {
            Ok(value) => value,
            Err(err) => serde_json::json!({ "error": err.to_string() }),
        },
        None => serde_json::json!({ "error": format!("tool '{}' is not implemented", call.name) }),
    };

    (call, result)
}
