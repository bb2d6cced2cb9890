use crate::errors::ChannelError;
use crate::events::{ChatMessage, ConnectionStatus, EventEmitter, SessionEvent};
use crate::protocol::{InboundEnvelope, OutboundEnvelope};
use crate::transport::{ChannelEvent, Transport};

/// One live connection to one room.
///
/// Pure state machine: the transport reports lifecycle events through
/// [`handle_event`](Self::handle_event) and the channel decides what they mean.
/// Status moves `Connecting -> Open -> Closed`, or straight to `Closed` when
/// the handshake fails. `Closed` is terminal; reconnecting means building a
/// new channel.
///
/// The transcript only ever grows from server `message` frames, including
/// for the local participant's own messages, so every participant sees the
/// server's ordering.
pub struct SessionChannel<T: Transport> {
    room_id: String,
    local_name: String,
    status: ConnectionStatus,
    messages: Vec<ChatMessage>,
    last_error: Option<ChannelError>,
    transport: T,
    emitter: EventEmitter,
}

impl<T: Transport> SessionChannel<T> {
    /// Wrap a transport that has just started connecting.
    pub fn new(room_id: impl Into<String>, local_name: impl Into<String>, transport: T) -> Self {
        Self::with_emitter(room_id, local_name, transport, EventEmitter::new())
    }

    pub fn with_emitter(
        room_id: impl Into<String>,
        local_name: impl Into<String>,
        transport: T,
        emitter: EventEmitter,
    ) -> Self {
        let room_id = room_id.into();
        tracing::info!("channel for room {room_id} connecting");
        Self {
            room_id,
            local_name: local_name.into(),
            status: ConnectionStatus::Connecting,
            messages: Vec::new(),
            last_error: None,
            transport,
            emitter,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The failure that closed the channel, if it did not close cleanly.
    pub fn last_error(&self) -> Option<&ChannelError> {
        self.last_error.as_ref()
    }

    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Apply one transport lifecycle event.
    pub fn handle_event(&mut self, event: ChannelEvent) {
        if self.status == ConnectionStatus::Closed {
            tracing::debug!("room {}: ignoring {event:?} after close", self.room_id);
            return;
        }

        match event {
            ChannelEvent::Ready => {
                if self.status == ConnectionStatus::Connecting {
                    self.set_status(ConnectionStatus::Open);
                }
            }
            ChannelEvent::Frame(frame) => self.handle_frame(&frame),
            ChannelEvent::Failed(reason) => self.fail(ChannelError::Transport(reason)),
            ChannelEvent::Closed { reason } => {
                tracing::info!("room {}: transport closed ({reason:?})", self.room_id);
                self.transport.close();
                self.set_status(ConnectionStatus::Closed);
            }
        }
    }

    /// Send a chat line as the local participant.
    ///
    /// Blank input and sends outside `Open` are dropped. Returns whether a
    /// frame was handed to the transport. The message shows up in
    /// [`messages`](Self::messages) once the server echoes it back.
    pub fn send_chat(&mut self, content: &str) -> bool {
        let content = content.trim();
        if content.is_empty() {
            return false;
        }
        self.transmit(OutboundEnvelope::Chat {
            speaker: self.local_name.clone(),
            content: content.to_string(),
        })
    }

    /// Ask the facilitator for feedback. No-op until the transcript has at
    /// least one message.
    pub fn request_feedback(&mut self) -> bool {
        if self.messages.is_empty() {
            tracing::debug!("room {}: no messages yet, not requesting feedback", self.room_id);
            return false;
        }
        self.transmit(OutboundEnvelope::FeedbackRequest)
    }

    /// Close the transport and enter `Closed`.
    pub fn close(&mut self) {
        self.transport.close();
        if self.status != ConnectionStatus::Closed {
            tracing::info!("room {}: leaving", self.room_id);
            self.set_status(ConnectionStatus::Closed);
        }
    }

    fn transmit(&mut self, envelope: OutboundEnvelope) -> bool {
        if self.status != ConnectionStatus::Open {
            tracing::debug!(
                "room {}: dropping {envelope:?} while {}",
                self.room_id,
                self.status.label()
            );
            return false;
        }

        let frame = match envelope.encode() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("room {}: {e}", self.room_id);
                return false;
            }
        };

        match self.transport.send_text(frame) {
            Ok(()) => true,
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    fn handle_frame(&mut self, frame: &str) {
        let envelope = match InboundEnvelope::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("room {}: dropping frame: {e}", self.room_id);
                return;
            }
        };

        match envelope {
            InboundEnvelope::Connected { room_id, timestamp } => {
                tracing::info!("connected to room {room_id} (server time {timestamp:?})");
                self.emitter.emit(SessionEvent::RoomJoined { room_id });
            }
            message @ InboundEnvelope::Message { .. } => {
                if let Some(msg) = message.into_chat_message() {
                    tracing::debug!("room {}: message from {}", self.room_id, msg.speaker);
                    self.messages.push(msg.clone());
                    self.emitter.emit(SessionEvent::MessageAppended(msg));
                }
            }
            InboundEnvelope::Error { message } => {
                tracing::warn!("room {}: server error: {message}", self.room_id);
                self.emitter.emit(SessionEvent::ServerNotice(message));
            }
            InboundEnvelope::Unknown => {
                tracing::debug!("room {}: ignoring unknown frame: {frame}", self.room_id);
            }
        }
    }

    fn fail(&mut self, error: ChannelError) {
        tracing::warn!("room {}: {error}", self.room_id);
        self.transport.close();
        self.emitter.emit(SessionEvent::ChannelFailed(error.to_string()));
        self.last_error = Some(error);
        self.set_status(ConnectionStatus::Closed);
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
        self.emitter.emit(SessionEvent::StatusChanged(status));
    }
}

impl<T: Transport> Drop for SessionChannel<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}
