use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Events emitted by a session channel to UI listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StatusChanged(ConnectionStatus),
    /// The server confirmed the channel is bound to this room.
    RoomJoined { room_id: String },
    MessageAppended(ChatMessage),
    /// Non-fatal error reported by the server (`error` frame).
    ServerNotice(String),
    /// The transport failed; a `StatusChanged(Closed)` follows.
    ChannelFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closed,
}

impl ConnectionStatus {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "connected",
            Self::Closed => "disconnected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[serde(alias = "user")]
    Human,
    Agent,
}

/// One entry of a session transcript, always as confirmed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub speaker: String,
    pub content: String,
    pub message_type: MessageType,
    /// Timestamp exactly as sent by the server.
    pub timestamp: String,
}

impl ChatMessage {
    pub fn is_agent(&self) -> bool {
        self.message_type == MessageType::Agent
    }

    /// Parse the server timestamp. Accepts RFC 3339 and naive ISO-8601
    /// (`2024-05-01T10:15:30.123456`), the latter being what the server emits.
    pub fn sent_at(&self) -> Option<NaiveDateTime> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(dt.naive_local());
        }
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f").ok()
    }
}

/// Receives [`SessionEvent`]s synchronously, on whatever task applies the
/// channel event. Keep `on_event` short; the channel waits for it.
pub trait SessionEventListener: Send + Sync {
    fn on_event(&self, event: SessionEvent);
}

/// Fan-out of session events. Clones share one listener list, so a listener
/// added through any clone sees every later event.
#[derive(Clone, Default)]
pub struct EventEmitter {
    listeners: Arc<std::sync::RwLock<Vec<Arc<dyn SessionEventListener>>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionEventListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    pub fn emit(&self, event: SessionEvent) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for listener in listeners.iter() {
            listener.on_event(event.clone());
        }
    }
}
