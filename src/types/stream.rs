//! Streaming types.

use serde::{Deserialize, Serialize};
use strum::Display;

/// One incremental unit of assistant output.
///
/// Produced by the completion provider, consumed exactly once by the relay
/// pipeline, never mutated after emission. Structurally mirrors the
/// provider's own chunk shape so it can be forwarded verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamDelta {
    /// Incremental text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Fragment of a tool invocation being assembled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallFragment>,
    /// Present only on the final delta of a stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl StreamDelta {
    /// A delta carrying only text content.
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            tool_call: None,
            finish_reason: None,
        }
    }

    /// A delta carrying only a tool-call fragment.
    pub fn tool_call(fragment: ToolCallFragment) -> Self {
        Self {
            content: None,
            tool_call: Some(fragment),
            finish_reason: None,
        }
    }

    /// A finish marker.
    pub fn finish(reason: FinishReason) -> Self {
        Self {
            content: None,
            tool_call: None,
            finish_reason: Some(reason),
        }
    }
}

/// A fragment of a streamed tool invocation.
///
/// The first fragment of an invocation carries its id and tool name; later
/// fragments carry only argument text. Fragments must be concatenated in
/// arrival order — arrival order is the only valid reconstruction order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: String,
}

/// Why a stream finished.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}
