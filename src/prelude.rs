//! Convenience re-exports of the public surface.

pub use crate::config::{Config, ProgressiveConfig, RetrievalConfig};
pub use crate::error::{Result, RivuletError};
pub use crate::progressive::PreambleGenerator;
pub use crate::provider::{
    Completion, CompletionProvider, DeltaStream, OpenAiProvider, ProviderRequest, ToolDefinition,
};
pub use crate::relay::channel::{frame_stream, ClientChannel, Frame, OutboundChannel};
pub use crate::relay::StreamRelay;
pub use crate::retrieval::{
    Augmenter, Embedder, EmbeddingScorer, ReferenceDocument, RelevanceScorer,
};
pub use crate::session::{Session, SessionStore};
pub use crate::tools::{FnTool, Tool, ToolRegistry};
pub use crate::types::{
    ChatMessage, ChatRequest, FinishReason, Role, SamplingSettings, StreamDelta, ToolCall,
    ToolCallFragment,
};
