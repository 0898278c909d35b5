//! Tool invocation state machine.
//!
//! One invocation cycle per assistant turn:
//! `Idle → Accumulating → Ready → Executed → Idle`. Argument fragments are
//! concatenated strictly in arrival order; arrival order is the only valid
//! reconstruction order.

use crate::error::{Result, RivuletError};
use crate::types::{ChatMessage, ToolCall, ToolCallFragment};

/// An invocation whose argument buffer is still being assembled, or has
/// just completed.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Tagged-variant accumulator for one invocation cycle.
#[derive(Debug, Default)]
pub enum ToolCallState {
    #[default]
    Idle,
    Accumulating(PendingCall),
    Ready(PendingCall),
    Executed {
        call: ToolCall,
        result: serde_json::Value,
    },
}

impl ToolCallState {
    /// Feed one streamed fragment into the machine.
    ///
    /// The first fragment captures the invocation's identifier, tool name,
    /// and first argument piece; later fragments append argument text. A
    /// fragment naming a different identifier mid-accumulation is a protocol
    /// violation — fragments for two interleaved invocations in one turn are
    /// unsupported and fail the turn.
    pub fn observe(&mut self, fragment: &ToolCallFragment) -> Result<()> {
        match self {
            ToolCallState::Idle => {
                let id = fragment.id.clone().ok_or_else(|| {
                    RivuletError::Protocol(
                        "tool invocation fragment arrived without an identifier".to_string(),
                    )
                })?;
                let name = fragment.name.clone().ok_or_else(|| {
                    RivuletError::Protocol(
                        "tool invocation fragment arrived without a tool name".to_string(),
                    )
                })?;
                *self = ToolCallState::Accumulating(PendingCall {
                    id,
                    name,
                    arguments: fragment.arguments.clone(),
                });
                Ok(())
            }
            ToolCallState::Accumulating(pending) => {
                if let Some(id) = fragment.id.as_deref() {
                    if id != pending.id {
                        return Err(RivuletError::Protocol(format!(
                            "interleaved fragments for distinct invocations '{}' and '{id}'",
                            pending.id
                        )));
                    }
                }
                pending.arguments.push_str(&fragment.arguments);
                Ok(())
            }
            ToolCallState::Ready(_) | ToolCallState::Executed { .. } => {
                Err(RivuletError::Protocol(
                    "tool invocation fragment arrived after the invocation completed".to_string(),
                ))
            }
        }
    }

    /// The provider signalled a finish reason of "tool invocation
    /// requested": the buffer is now a complete, parseable payload.
    pub fn finish(&mut self) -> Result<()> {
        match std::mem::take(self) {
            ToolCallState::Accumulating(pending) => {
                *self = ToolCallState::Ready(pending);
                Ok(())
            }
            other => {
                *self = other;
                Err(RivuletError::Protocol(
                    "provider requested tool invocation with no accumulated fragments".to_string(),
                ))
            }
        }
    }

    /// Take the completed invocation for execution, leaving the machine
    /// idle. Returns `None` unless the machine is in `Ready`.
    pub fn take_ready(&mut self) -> Option<PendingCall> {
        match std::mem::take(self) {
            ToolCallState::Ready(pending) => Some(pending),
            other => {
                *self = other;
                None
            }
        }
    }

    /// Record the executed invocation and its result.
    pub fn record_executed(&mut self, call: ToolCall, result: serde_json::Value) {
        *self = ToolCallState::Executed { call, result };
    }

    /// Close the cycle: produce the two messages appended to history in
    /// order — the assistant invocation record, then the tool result
    /// referencing it — and return the machine to idle.
    pub fn fold(&mut self) -> Option<(ChatMessage, ChatMessage)> {
        match std::mem::take(self) {
            ToolCallState::Executed { call, result } => {
                let record = ChatMessage::assistant_tool_call(call.clone());
                let result_message = ChatMessage::tool_result(call.id, result.to_string());
                Some((record, result_message))
            }
            other => {
                *self = other;
                None
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ToolCallState::Idle)
    }

    pub fn is_accumulating(&self) -> bool {
        matches!(self, ToolCallState::Accumulating(_))
    }
}
