//! Completion provider trait and the OpenAI-compatible implementation.

pub mod http;
pub mod openai;

pub use openai::OpenAiProvider;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{ChatMessage, FinishReason, SamplingSettings, StreamDelta};

/// A lazily produced sequence of incremental deltas.
pub type DeltaStream = BoxStream<'static, Result<StreamDelta>>;

/// A request sent to a completion provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub settings: SamplingSettings,
}

/// Tool declaration sent to the provider API.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A single, non-streamed completion result.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub finish_reason: Option<FinishReason>,
}

/// External language-model boundary: accepts a model id, an ordered message
/// list, and optional tool declarations; returns either a single result or a
/// lazy delta sequence. May fail or disconnect at any point.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name, for diagnostics.
    fn provider_name(&self) -> &str;

    /// Generate a single completion (non-streaming).
    async fn complete(&self, request: &ProviderRequest) -> Result<Completion>;

    /// Open a streamed completion.
    async fn stream(&self, request: &ProviderRequest) -> Result<DeltaStream>;
}
