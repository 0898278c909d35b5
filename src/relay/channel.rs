//! Client output channel: framing and liveness.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::types::StreamDelta;

/// One event on the client channel: a delta structurally identical to the
/// provider's incremental-chunk shape, an error object, or the terminal
/// sentinel after which no further frames arrive.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Frame {
    Delta(StreamDelta),
    Error { error: String },
    Done,
}

impl Frame {
    /// Whether this frame ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Error { .. } | Frame::Done)
    }

    /// Render this frame as a server-sent-event data line.
    pub fn to_sse(&self) -> String {
        match self {
            Frame::Done => "data: [DONE]\n\n".to_string(),
            Frame::Error { error } => format!(
                "data: {}\n\n",
                serde_json::json!({ "error": error })
            ),
            Frame::Delta(delta) => format!(
                "data: {}\n\n",
                serde_json::to_string(delta).unwrap_or_else(|_| "{}".to_string())
            ),
        }
    }
}

/// Long-lived push channel toward one client.
///
/// Closure is the only cancellation signal: once `send` returns `false` or
/// `is_closed` reports true, the client is gone and the request's task tree
/// terminates early.
pub trait OutboundChannel: Send + Sync {
    /// Forward a frame. Returns `false` when the client has disconnected.
    fn send(&self, frame: Frame) -> bool;

    /// Whether the client has disconnected.
    fn is_closed(&self) -> bool;
}

/// mpsc-backed channel; the transport layer drains the receiver into the
/// actual wire connection and drops it on client disconnect.
pub struct ClientChannel {
    tx: mpsc::UnboundedSender<Frame>,
}

impl ClientChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

/// Wrap the receiving half for transports that consume a `Stream` of frames
/// (e.g. an SSE response body).
pub fn frame_stream(
    rx: mpsc::UnboundedReceiver<Frame>,
) -> tokio_stream::wrappers::UnboundedReceiverStream<Frame> {
    tokio_stream::wrappers::UnboundedReceiverStream::new(rx)
}

impl OutboundChannel for ClientChannel {
    fn send(&self, frame: Frame) -> bool {
        self.tx.send(frame).is_ok()
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
