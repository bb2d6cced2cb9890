use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::errors::ChannelError;

/// Lifecycle signals a transport reports to its channel, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Handshake finished; the transport accepts frames.
    Ready,
    /// One inbound text frame.
    Frame(String),
    Failed(String),
    Closed { reason: Option<String> },
}

/// The sending half of a live connection, as seen by a [`SessionChannel`].
///
/// [`SessionChannel`]: crate::channel::SessionChannel
pub trait Transport {
    /// Queue one discrete text frame.
    fn send_text(&mut self, frame: String) -> Result<(), ChannelError>;

    /// Release the connection. Must be idempotent.
    fn close(&mut self);
}

enum Outgoing {
    Frame(String),
    Close,
}

/// WebSocket transport backed by a tokio task.
///
/// The task owns the socket; frames are handed over through an unbounded
/// queue so they go out in the order they were sent.
pub struct WsTransport {
    outgoing: Option<UnboundedSender<Outgoing>>,
    task: Option<JoinHandle<()>>,
}

impl WsTransport {
    /// Start connecting to `url` right away. Must be called inside a tokio runtime.
    ///
    /// Lifecycle events arrive on the returned receiver.
    pub fn connect(url: String) -> (Self, UnboundedReceiver<ChannelEvent>) {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_connection(url, outgoing_rx, events_tx));

        (
            Self {
                outgoing: Some(outgoing_tx),
                task: Some(task),
            },
            events_rx,
        )
    }

    /// Close and wait up to `grace` for the close handshake to go out.
    pub async fn shutdown(&mut self, grace: Duration) {
        self.close();
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(grace, &mut task).await.is_err() {
                tracing::warn!("channel task did not stop within {grace:?}, aborting");
                task.abort();
            }
        }
    }
}

impl Transport for WsTransport {
    fn send_text(&mut self, frame: String) -> Result<(), ChannelError> {
        let outgoing = self.outgoing.as_ref().ok_or(ChannelError::Closed)?;
        outgoing
            .send(Outgoing::Frame(frame))
            .map_err(|_| ChannelError::Transport("connection task has stopped".into()))
    }

    fn close(&mut self) {
        if let Some(outgoing) = self.outgoing.take() {
            // The task may already be gone; nothing left to release then.
            let _ = outgoing.send(Outgoing::Close);
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_connection(
    url: String,
    mut outgoing: UnboundedReceiver<Outgoing>,
    events: UnboundedSender<ChannelEvent>,
) {
    tracing::info!("opening channel {url}");

    let handshake = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = close_requested(&mut outgoing) => {
            tracing::info!("channel closed during handshake");
            let _ = events.send(ChannelEvent::Closed { reason: None });
            return;
        }
    };

    let ws = match handshake {
        Ok((ws, _response)) => ws,
        Err(e) => {
            tracing::warn!("channel handshake failed: {e}");
            let _ = events.send(ChannelEvent::Failed(e.to_string()));
            return;
        }
    };

    if events.send(ChannelEvent::Ready).is_err() {
        return;
    }

    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            outbound = outgoing.recv() => match outbound {
                Some(Outgoing::Frame(text)) => {
                    if let Err(e) = sink.send(Message::text(text)).await {
                        tracing::warn!("channel send failed: {e}");
                        let _ = events.send(ChannelEvent::Failed(e.to_string()));
                        return;
                    }
                }
                Some(Outgoing::Close) | None => {
                    if let Err(e) = sink.close().await {
                        tracing::debug!("close handshake failed: {e}");
                    }
                    tracing::info!("channel closed by client");
                    let _ = events.send(ChannelEvent::Closed { reason: None });
                    return;
                }
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if events.send(ChannelEvent::Frame(text.as_str().to_owned())).is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.as_str().to_owned())
                        .filter(|r| !r.is_empty());
                    tracing::info!("channel closed by server: {reason:?}");
                    let _ = events.send(ChannelEvent::Closed { reason });
                    return;
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::debug!("ignoring binary frame ({} bytes)", data.len());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("channel receive failed: {e}");
                    let _ = events.send(ChannelEvent::Failed(e.to_string()));
                    return;
                }
                None => {
                    tracing::info!("channel stream ended");
                    let _ = events.send(ChannelEvent::Closed { reason: None });
                    return;
                }
            }
        }
    }
}

/// Resolves once the owner asks to close (or goes away) before the handshake
/// completes. Nothing may be sent before `Ready`, so stray frames are dropped.
async fn close_requested(outgoing: &mut UnboundedReceiver<Outgoing>) {
    while let Some(message) = outgoing.recv().await {
        match message {
            Outgoing::Close => return,
            Outgoing::Frame(_) => tracing::debug!("dropping frame queued before handshake"),
        }
    }
}
