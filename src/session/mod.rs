//! In-memory session store with bounded history and idle expiry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::Config;
use crate::types::ChatMessage;

/// A server-held conversation history.
///
/// Index 0 is always the instruction message. A session without an
/// identifier is ephemeral: it is never registered in the store and is
/// garbage-collected at the end of its request.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Option<String>,
    pub history: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl Session {
    fn seeded(id: Option<String>, instruction: &str) -> Self {
        let now = Utc::now();
        Self {
            id,
            history: vec![ChatMessage::system(instruction)],
            created_at: now,
            last_accessed: now,
        }
    }
}

/// Owns per-session history; bounds its size; expires idle sessions.
///
/// All mutation goes through the map's write lock and never suspends while
/// holding it, so concurrent requests see whole messages, never interleaved
/// partial writes. Operations are pure in-memory bookkeeping and never fail.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    instruction: String,
    max_messages: usize,
    idle_expiry: Duration,
}

impl SessionStore {
    pub fn new(
        instruction: impl Into<String>,
        max_messages: usize,
        idle_expiry: Duration,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            instruction: instruction.into(),
            max_messages,
            idle_expiry,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.instruction.clone(),
            config.max_messages,
            config.idle_expiry,
        )
    }

    /// Resolve a session by id.
    ///
    /// Without an id, returns a fresh unregistered session — concurrent
    /// callers with no identifier never see each other's state. With an
    /// unknown id, creates and registers one. With a known id, returns the
    /// existing session and refreshes its last-access timestamp.
    pub fn resolve(&self, session_id: Option<&str>) -> Session {
        let Some(id) = session_id else {
            return Session::seeded(None, &self.instruction);
        };

        let mut sessions = self.sessions.write().unwrap();
        let session = sessions
            .entry(id.to_string())
            .or_insert_with(|| Session::seeded(Some(id.to_string()), &self.instruction));
        session.last_accessed = Utc::now();
        session.clone()
    }

    /// Append a message to a registered session's history, enforcing the
    /// retention bound. Discards the message when no id is given.
    pub fn append(&self, session_id: Option<&str>, message: ChatMessage) {
        let Some(id) = session_id else { return };

        let mut sessions = self.sessions.write().unwrap();
        let session = sessions
            .entry(id.to_string())
            .or_insert_with(|| Session::seeded(Some(id.to_string()), &self.instruction));
        session.history.push(message);
        trim_history(&mut session.history, self.max_messages);
        session.last_accessed = Utc::now();
    }

    /// Overwrite the instruction message (index 0) in place. A
    /// request-supplied instruction always wins over the stored one.
    pub fn replace_instruction(&self, session_id: Option<&str>, message: ChatMessage) {
        let Some(id) = session_id else { return };

        let mut sessions = self.sessions.write().unwrap();
        let session = sessions
            .entry(id.to_string())
            .or_insert_with(|| Session::seeded(Some(id.to_string()), &self.instruction));
        session.history[0] = message;
        session.last_accessed = Utc::now();
    }

    /// Remove every session idle beyond the configured expiry.
    pub fn sweep_idle(&self) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, session| {
            now.signed_duration_since(session.last_accessed)
                .to_std()
                .map(|idle| idle <= self.idle_expiry)
                .unwrap_or(true)
        });
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "swept idle sessions");
        }
    }

    /// Spawn the periodic expiry sweep. Runs until the returned handle is
    /// aborted or the runtime shuts down; never blocks request handling.
    pub fn spawn_sweep(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                store.sweep_idle();
            }
        })
    }

    /// Whether a session is registered under this id.
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions
            .read()
            .unwrap()
            .contains_key(session_id)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keep the pinned instruction plus the most recent `max_messages`
/// non-instruction messages; older ones are discarded unconditionally.
fn trim_history(history: &mut Vec<ChatMessage>, max_messages: usize) {
    if history.len() > max_messages + 1 {
        let excess = history.len() - (max_messages + 1);
        history.drain(1..1 + excess);
    }
}
