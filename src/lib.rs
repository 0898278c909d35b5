//! rivulet — streaming chat orchestration engine
//!
//! Mediates real-time conversational exchanges with an external
//! language-model provider, streaming incremental output to a client over a
//! long-lived push channel while maintaining per-session dialogue state.
//! Covers session management with bounded history and expiry, the
//! server-push relay loop, a progressive dual-model preamble, a mid-stream
//! tool-invocation state machine, and retrieval augmentation of the
//! instruction message.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use rivulet::prelude::*;
//!
//! # async fn example() {
//! let config = Config::from_env();
//! let provider = Arc::new(OpenAiProvider::from_config(&config).expect("credential"));
//! let store = SessionStore::from_config(&config);
//! store.spawn_sweep(config.sweep_interval);
//!
//! let relay = StreamRelay::new(store, provider, config.default_model.clone());
//! let (channel, mut rx) = ClientChannel::new();
//! let request = ChatRequest::builder()
//!     .session_id("s1")
//!     .messages(vec![ChatMessage::user("hi")])
//!     .build();
//! relay.handle(request, &channel).await;
//! while let Some(frame) = rx.recv().await {
//!     print!("{}", frame.to_sse());
//! }
//! # }
//! ```

pub mod config;
pub mod error;
pub mod progressive;
pub mod provider;
pub mod relay;
pub mod retrieval;
pub mod session;
pub mod tools;
pub mod types;

pub mod prelude;
