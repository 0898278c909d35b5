//! Core data types.

pub mod message;
pub mod request;
pub mod stream;

pub use message::{ChatMessage, Role, ToolCall};
pub use request::{ChatRequest, SamplingSettings};
pub use stream::{FinishReason, StreamDelta, ToolCallFragment};
