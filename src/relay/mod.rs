//! Stream relay: the single coordinating loop that drives a request
//! end-to-end and guarantees exactly one terminal action per request.

pub mod channel;

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, warn};

use crate::error::{Result, RivuletError};
use crate::progressive::PreambleGenerator;
use crate::provider::{CompletionProvider, ProviderRequest};
use crate::retrieval::Augmenter;
use crate::session::SessionStore;
use crate::tools::accumulator::ToolCallState;
use crate::tools::{executor, ToolRegistry};
use crate::types::{
    ChatMessage, ChatRequest, FinishReason, Role, SamplingSettings,
};

use self::channel::{Frame, OutboundChannel};

/// Continuation calls can themselves request tools; bound the cycle count
/// so a misbehaving model cannot loop forever.
const MAX_TOOL_CYCLES: usize = 8;

/// How a request left the relay loop.
enum Exit {
    Completed,
    Disconnected,
}

/// Owns the per-request lifecycle: session resolution, optional retrieval
/// augmentation and preamble, the primary provider stream, tool invocation
/// cycles, and terminal framing.
pub struct StreamRelay {
    store: SessionStore,
    provider: Arc<dyn CompletionProvider>,
    tools: ToolRegistry,
    augmenter: Option<Augmenter>,
    preamble: Option<PreambleGenerator>,
    default_model: String,
    settings: SamplingSettings,
}

impl StreamRelay {
    pub fn new(
        store: SessionStore,
        provider: Arc<dyn CompletionProvider>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            tools: ToolRegistry::new(),
            augmenter: None,
            preamble: None,
            default_model: default_model.into(),
            settings: SamplingSettings::default(),
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_augmenter(mut self, augmenter: Augmenter) -> Self {
        self.augmenter = Some(augmenter);
        self
    }

    pub fn with_preamble(mut self, preamble: PreambleGenerator) -> Self {
        self.preamble = Some(preamble);
        self
    }

    pub fn with_settings(mut self, settings: SamplingSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Drive a request to completion, writing to the client channel.
    ///
    /// Exactly one of {terminal sentinel, error frame then close, silent
    /// close on client disconnect} occurs per call — never more than one
    /// terminal action.
    pub async fn handle(&self, request: ChatRequest, channel: &dyn OutboundChannel) {
        match self.drive(request, channel).await {
            Ok(Exit::Completed) => {
                channel.send(Frame::Done);
            }
            Ok(Exit::Disconnected) => {
                debug!("client disconnected, stream abandoned");
            }
            Err(err) => {
                warn!(error = %err, "request failed");
                channel.send(Frame::Error {
                    error: err.to_string(),
                });
            }
        }
    }

    async fn drive(
        &self,
        request: ChatRequest,
        channel: &dyn OutboundChannel,
    ) -> Result<Exit> {
        let session_id = request.session_id.clone();
        let sid = session_id.as_deref();

        let session = self.store.resolve(sid);
        let mut history = session.history;

        // Fold supplied messages in: a leading instruction replaces index 0,
        // everything else is appended in order.
        let mut supplied = request.messages.into_iter().peekable();
        if supplied
            .peek()
            .is_some_and(|m| m.role == Role::System)
        {
            if let Some(instruction) = supplied.next() {
                history[0] = instruction.clone();
                self.store.replace_instruction(sid, instruction);
            }
        }
        for message in supplied {
            history.push(message.clone());
            self.store.append(sid, message);
        }

        if let Some(augmenter) = &self.augmenter {
            if let Some(query) = latest_user_content(&history) {
                let rewritten = augmenter.augment(&query, &history[0]);
                self.store.replace_instruction(sid, rewritten.clone());
                history[0] = rewritten;
            }
        }

        if let Some(preamble) = &self.preamble {
            preamble
                .maybe_emit(request.progressive_override, &history, channel)
                .await;
        }
        if channel.is_closed() {
            return Ok(Exit::Disconnected);
        }

        let model = request
            .model
            .unwrap_or_else(|| self.default_model.clone());
        let tool_definitions = (!self.tools.is_empty()).then(|| self.tools.definitions());

        let mut assistant_text = String::new();
        let mut cycles = 0usize;

        loop {
            cycles += 1;
            if cycles > MAX_TOOL_CYCLES {
                return Err(RivuletError::Stream(
                    "tool invocation cycle limit exceeded".to_string(),
                ));
            }

            let provider_request = ProviderRequest {
                model: model.clone(),
                messages: history.clone(),
                tools: tool_definitions.clone(),
                settings: self.settings.clone(),
            };
            let mut stream = self.provider.stream(&provider_request).await?;
            let mut state = ToolCallState::default();

            while let Some(item) = stream.next().await {
                if channel.is_closed() {
                    return Ok(Exit::Disconnected);
                }
                let delta = item?;

                if let Some(fragment) = &delta.tool_call {
                    // Invocation fragments never reach the client.
                    state.observe(fragment)?;
                } else if let Some(text) = delta.content.as_deref() {
                    if !text.is_empty() {
                        assistant_text.push_str(text);
                        if !channel.send(Frame::Delta(delta.clone())) {
                            return Ok(Exit::Disconnected);
                        }
                    }
                }

                if let Some(reason) = delta.finish_reason {
                    if reason == FinishReason::ToolCalls {
                        state.finish()?;
                    }
                    break;
                }
            }

            let Some(pending) = state.take_ready() else {
                break;
            };

            // Execution is awaited before any further streaming: the
            // continuation call requires the result.
            let (call, result) = executor::execute(pending, &self.tools).await;
            debug!(tool = %call.name, "tool invocation executed");
            state.record_executed(call, result);
            if let Some((invocation_record, result_message)) = state.fold() {
                history.push(invocation_record.clone());
                history.push(result_message.clone());
                self.store.append(sid, invocation_record);
                self.store.append(sid, result_message);
            }
        }

        // Ephemeral sessions carry no id: append is a no-op and the history
        // is dropped with this request.
        if !assistant_text.is_empty() {
            self.store
                .append(sid, ChatMessage::assistant(assistant_text));
        }

        Ok(Exit::Completed)
    }
}

fn latest_user_content(history: &[ChatMessage]) -> Option<String> {
    history
        .iter()
        .rev()
        .find(|m| m.role == Role::User && !m.text_content().is_empty())
        .map(|m| m.text_content().to_string())
}
