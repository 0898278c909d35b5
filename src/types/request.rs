//! Inbound request types.

use bon::Builder;
use serde::{Deserialize, Serialize};

use super::message::ChatMessage;

/// An inbound conversational request.
///
/// The session identifier may instead arrive via a transport-level header;
/// the entry point applies it with [`ChatRequest::with_header_session`], and
/// a header value always wins over the body field.
#[derive(Debug, Clone, Default, Builder, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatRequest {
    #[builder(into)]
    pub session_id: Option<String>,
    #[builder(default)]
    pub messages: Vec<ChatMessage>,
    #[builder(into)]
    pub model: Option<String>,
    /// Request-level override for progressive response; always wins over the
    /// deployment default, in both directions.
    #[serde(rename = "progressiveResponseOverride")]
    pub progressive_override: Option<bool>,
}

impl ChatRequest {
    /// Apply a session id taken from a transport header, which takes
    /// precedence over any body-supplied value.
    pub fn with_header_session(mut self, session_id: Option<String>) -> Self {
        if session_id.is_some() {
            self.session_id = session_id;
        }
        self
    }
}

/// Sampling settings forwarded to the completion provider.
#[derive(Debug, Clone, Default, Builder, Serialize, Deserialize)]
pub struct SamplingSettings {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
}
