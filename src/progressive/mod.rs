//! Progressive response: a best-effort short preliminary reply emitted
//! before the full answer to reduce perceived latency.

use std::sync::Arc;

use tracing::debug;

use crate::config::ProgressiveConfig;
use crate::provider::{CompletionProvider, ProviderRequest};
use crate::relay::channel::{Frame, OutboundChannel};
use crate::types::{ChatMessage, Role, SamplingSettings, StreamDelta};

const PREAMBLE_INSTRUCTION: &str = "Produce one brief transitional acknowledgement that you \
are working on the user's request. Do not answer the request itself.";

/// Issues one short-circuit secondary-model call ahead of the primary
/// stream. Best-effort latency mitigation, never a correctness requirement.
pub struct PreambleGenerator {
    provider: Arc<dyn CompletionProvider>,
    config: ProgressiveConfig,
}

impl PreambleGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: ProgressiveConfig) -> Self {
        Self { provider, config }
    }

    /// Emit a preamble when eligible, returning whether one was forwarded.
    ///
    /// A request-level override always wins over the deployment default, in
    /// both directions. The preamble only fires when the most recent message
    /// is from the user. Failures are swallowed; the primary call proceeds
    /// unaffected.
    pub async fn maybe_emit(
        &self,
        override_flag: Option<bool>,
        history: &[ChatMessage],
        channel: &dyn OutboundChannel,
    ) -> bool {
        let enabled = override_flag.unwrap_or(self.config.enabled);
        if !enabled {
            return false;
        }

        let Some(latest) = history.last().filter(|m| m.role == Role::User) else {
            return false;
        };
        let user_content = latest.text_content();
        if user_content.is_empty() {
            return false;
        }

        let request = ProviderRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(PREAMBLE_INSTRUCTION),
                ChatMessage::user(user_content),
            ],
            tools: None,
            settings: SamplingSettings {
                max_tokens: Some(self.config.max_tokens),
                temperature: Some(self.config.temperature),
                top_p: None,
            },
        };

        match self.provider.complete(&request).await {
            Ok(completion) if !completion.content.is_empty() => {
                channel.send(Frame::Delta(StreamDelta::content(completion.content)))
            }
            Ok(_) => false,
            Err(err) => {
                debug!(error = %err, "preamble call failed, proceeding without one");
                false
            }
        }
    }
}
