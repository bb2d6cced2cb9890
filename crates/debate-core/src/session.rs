use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::channel::SessionChannel;
use crate::config::ServerConfig;
use crate::events::{ChatMessage, ConnectionStatus, EventEmitter, SessionEventListener};
use crate::provision::RoomDescriptor;
use crate::transport::{ChannelEvent, WsTransport};

/// How long `leave` waits for the close handshake before giving up.
const LEAVE_GRACE: Duration = Duration::from_secs(2);

/// One client's participation in one room, from join until leave.
///
/// Owns the room descriptor, the channel and its transcript. Nothing here is
/// shared with other sessions; dropping the session releases the connection.
pub struct RoomSession {
    descriptor: RoomDescriptor,
    channel: SessionChannel<WsTransport>,
    events: UnboundedReceiver<ChannelEvent>,
}

impl RoomSession {
    /// Enter `Connecting` and start the WebSocket handshake for the room.
    /// Must be called inside a tokio runtime.
    pub fn open(config: &ServerConfig, descriptor: RoomDescriptor, local_name: &str) -> Self {
        Self::open_with_emitter(config, descriptor, local_name, EventEmitter::new())
    }

    pub fn open_with_emitter(
        config: &ServerConfig,
        descriptor: RoomDescriptor,
        local_name: &str,
        emitter: EventEmitter,
    ) -> Self {
        let url = config.channel_endpoint(&descriptor.room_id);
        let (transport, events) = WsTransport::connect(url);
        let channel = SessionChannel::with_emitter(
            descriptor.room_id.clone(),
            local_name.trim(),
            transport,
            emitter,
        );
        Self {
            descriptor,
            channel,
            events,
        }
    }

    pub fn descriptor(&self) -> &RoomDescriptor {
        &self.descriptor
    }

    pub fn local_name(&self) -> &str {
        self.channel.local_name()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.channel.status()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.channel.messages()
    }

    pub fn channel(&self) -> &SessionChannel<WsTransport> {
        &self.channel
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionEventListener>) {
        self.channel.emitter().add_listener(listener);
    }

    /// Wait for the next transport event and apply it.
    ///
    /// Returns `None` once the channel is closed; otherwise the event that
    /// was applied.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        if self.channel.status() == ConnectionStatus::Closed {
            return None;
        }
        let event = self
            .events
            .recv()
            .await
            .unwrap_or(ChannelEvent::Closed { reason: None });
        self.channel.handle_event(event.clone());
        Some(event)
    }

    /// Keep applying events until the channel is open. Returns `false` if it
    /// closed instead.
    pub async fn wait_until_open(&mut self) -> bool {
        while self.channel.status() == ConnectionStatus::Connecting {
            if self.next_event().await.is_none() {
                break;
            }
        }
        self.channel.status() == ConnectionStatus::Open
    }

    pub fn send_chat(&mut self, content: &str) -> bool {
        self.apply_pending();
        self.channel.send_chat(content)
    }

    pub fn request_feedback(&mut self) -> bool {
        self.apply_pending();
        self.channel.request_feedback()
    }

    /// Apply lifecycle events that are already queued, without waiting.
    ///
    /// A transport that died reports why on the event queue; applying that
    /// first keeps the real reason as the channel's last error.
    fn apply_pending(&mut self) {
        while self.channel.status() != ConnectionStatus::Closed {
            match self.events.try_recv() {
                Ok(event) => self.channel.handle_event(event),
                Err(_) => break,
            }
        }
    }

    /// Close the channel and wait briefly for the close frame to go out.
    pub async fn leave(mut self) {
        tracing::info!("leaving room {}", self.descriptor.room_id);
        self.channel.close();
        self.channel.transport_mut().shutdown(LEAVE_GRACE).await;
    }
}
