//! Wire envelopes of the live room channel.
//!
//! Every frame is a single JSON object tagged by its `type` field.

use serde::{Deserialize, Serialize};

use crate::errors::{ChannelError, ProtocolError};
use crate::events::{ChatMessage, MessageType};

/// A user action serialized onto the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEnvelope {
    #[serde(rename = "message")]
    Chat { speaker: String, content: String },
    #[serde(rename = "request_feedback")]
    FeedbackRequest,
}

impl OutboundEnvelope {
    pub fn encode(&self) -> Result<String, ChannelError> {
        serde_json::to_string(self).map_err(|e| ChannelError::Encode(e.to_string()))
    }
}

/// A server event read off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEnvelope {
    Connected {
        room_id: String,
        #[serde(default)]
        timestamp: Option<String>,
    },
    Message {
        speaker: String,
        content: String,
        message_type: MessageType,
        timestamp: String,
    },
    Error { message: String },
    /// Any `type` this client does not know yet.
    #[serde(other)]
    Unknown,
}

impl InboundEnvelope {
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(frame).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// The transcript entry carried by a `message` frame, if any.
    pub fn into_chat_message(self) -> Option<ChatMessage> {
        match self {
            Self::Message {
                speaker,
                content,
                message_type,
                timestamp,
            } => Some(ChatMessage {
                speaker,
                content,
                message_type,
                timestamp,
            }),
            _ => None,
        }
    }
}
