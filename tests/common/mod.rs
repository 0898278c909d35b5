//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rivulet::error::{Result, RivuletError};
use rivulet::prelude::*;

pub const INSTRUCTION: &str = "You are a helpful assistant.";

/// One scripted provider interaction, consumed in order.
pub enum Call {
    /// `stream()` succeeds and yields these items.
    Stream(Vec<Item>),
    /// `stream()` itself fails.
    StreamFail(String),
    /// `complete()` succeeds with this text.
    Complete(String),
    /// `complete()` fails.
    CompleteFail(String),
}

pub enum Item {
    Delta(StreamDelta),
    Err(String),
}

impl Item {
    pub fn content(text: &str) -> Self {
        Item::Delta(StreamDelta::content(text))
    }

    pub fn finish(reason: FinishReason) -> Self {
        Item::Delta(StreamDelta::finish(reason))
    }

    pub fn fragment(id: Option<&str>, name: Option<&str>, arguments: &str) -> Self {
        Item::Delta(StreamDelta::tool_call(ToolCallFragment {
            id: id.map(String::from),
            name: name.map(String::from),
            arguments: arguments.to_string(),
        }))
    }
}

/// Provider scripted with successive calls. Panics when the script runs dry
/// or a call kind mismatches — both indicate a broken test.
pub struct ScriptedProvider {
    calls: Mutex<VecDeque<Call>>,
    delay: Duration,
    pub seen: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(calls: Vec<Call>) -> Self {
        Self {
            calls: Mutex::new(calls.into()),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Sleep this long before each streamed item.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn next_call(&self) -> Call {
        self.calls
            .lock()
            .unwrap()
            .pop_front()
            .expect("provider script exhausted")
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<Completion> {
        self.seen.lock().unwrap().push(request.clone());
        match self.next_call() {
            Call::Complete(text) => Ok(Completion {
                content: text,
                finish_reason: Some(FinishReason::Stop),
            }),
            Call::CompleteFail(message) => Err(RivuletError::Stream(message)),
            _ => panic!("scripted call mismatch: expected complete"),
        }
    }

    async fn stream(&self, request: &ProviderRequest) -> Result<DeltaStream> {
        self.seen.lock().unwrap().push(request.clone());
        let delay = self.delay;
        match self.next_call() {
            Call::Stream(items) => {
                let stream = async_stream::stream! {
                    for item in items {
                        if delay > Duration::ZERO {
                            tokio::time::sleep(delay).await;
                        }
                        match item {
                            Item::Delta(delta) => yield Ok(delta),
                            Item::Err(message) => {
                                yield Err(RivuletError::Stream(message));
                                break;
                            }
                        }
                    }
                };
                Ok(Box::pin(stream))
            }
            Call::StreamFail(message) => Err(RivuletError::Stream(message)),
            _ => panic!("scripted call mismatch: expected stream"),
        }
    }
}

pub fn store(max_messages: usize) -> SessionStore {
    SessionStore::new(INSTRUCTION, max_messages, Duration::from_secs(3600))
}

/// Drain every frame already delivered to the receiver.
pub fn drain_frames(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Frame>) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

/// Concatenated text of all delta frames.
pub fn delta_text(frames: &[Frame]) -> String {
    frames
        .iter()
        .filter_map(|frame| match frame {
            Frame::Delta(delta) => delta.content.clone(),
            _ => None,
        })
        .collect()
}

pub fn terminal_count(frames: &[Frame]) -> usize {
    frames.iter().filter(|f| f.is_terminal()).count()
}
