use std::time::Duration;

use debate_core::{
    ChannelError, ConnectionStatus, MessageType, RoomDescriptor, RoomKind, RoomSession,
    ServerConfig,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};

const TIMEOUT: Duration = Duration::from_secs(5);

fn descriptor(room_id: &str) -> RoomDescriptor {
    RoomDescriptor {
        room_id: room_id.to_string(),
        topic: "Should cities ban cars?".to_string(),
        room_type: RoomKind::Debate,
        participants: vec!["Bob".to_string(), "Carol".to_string()],
    }
}

async fn bind() -> (TcpListener, ServerConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig::parse(&format!("http://{addr}")).unwrap();
    (listener, config)
}

/// Accept one WebSocket client and report the path it asked for.
async fn accept(listener: &TcpListener) -> (WebSocketStream<TcpStream>, String) {
    let (stream, _) = listener.accept().await.unwrap();
    let mut path = String::new();
    let ws = accept_hdr_async(stream, |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        path = req.uri().path().to_string();
        Ok(resp)
    })
    .await
    .unwrap();
    (ws, path)
}

async fn send_json(ws: &mut WebSocketStream<TcpStream>, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

async fn recv_json(ws: &mut WebSocketStream<TcpStream>) -> Value {
    loop {
        let msg = ws.next().await.unwrap().unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Drain the socket until the client's close frame (or EOF) arrives.
async fn wait_for_close(ws: &mut WebSocketStream<TcpStream>) -> bool {
    while let Some(msg) = ws.next().await {
        match msg {
            Ok(Message::Close(_)) => return true,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
    false
}

async fn wait_for_messages(session: &mut RoomSession, count: usize) {
    tokio::time::timeout(TIMEOUT, async {
        while session.messages().len() < count {
            if session.next_event().await.is_none() {
                break;
            }
        }
    })
    .await
    .expect("timed out waiting for messages");
}

async fn wait_for_close_status(session: &mut RoomSession) {
    tokio::time::timeout(TIMEOUT, async {
        while session.next_event().await.is_some() {}
    })
    .await
    .expect("timed out waiting for close");
}

#[tokio::test]
async fn chat_and_feedback_round_trip_through_server() {
    let (listener, config) = bind().await;

    let server = tokio::spawn(async move {
        let (mut ws, path) = accept(&listener).await;
        send_json(&mut ws, json!({"type": "connected", "room_id": "r1"})).await;

        let chat = recv_json(&mut ws).await;
        send_json(
            &mut ws,
            json!({
                "type": "message",
                "speaker": chat["speaker"],
                "content": chat["content"],
                "message_type": "user",
                "timestamp": "2024-05-01T10:01:00.000000"
            }),
        )
        .await;

        let feedback = recv_json(&mut ws).await;
        send_json(
            &mut ws,
            json!({
                "type": "message",
                "speaker": "Facilitator",
                "content": "Good points so far.",
                "message_type": "agent",
                "timestamp": "2024-05-01T10:01:05.000000"
            }),
        )
        .await;

        let closed = wait_for_close(&mut ws).await;
        (path, chat, feedback, closed)
    });

    let mut session = RoomSession::open(&config, descriptor("r1"), "Alice");
    assert_eq!(session.status(), ConnectionStatus::Connecting);
    assert!(tokio::time::timeout(TIMEOUT, session.wait_until_open()).await.unwrap());

    assert!(!session.request_feedback());
    assert!(session.send_chat("  Hello everyone  "));
    assert!(session.messages().is_empty());

    wait_for_messages(&mut session, 1).await;
    let echoed = &session.messages()[0];
    assert_eq!(echoed.speaker, "Alice");
    assert_eq!(echoed.content, "Hello everyone");
    assert_eq!(echoed.message_type, MessageType::Human);

    assert!(session.request_feedback());
    wait_for_messages(&mut session, 2).await;
    assert_eq!(session.messages()[1].speaker, "Facilitator");
    assert_eq!(session.messages()[1].message_type, MessageType::Agent);

    session.leave().await;

    let (path, chat, feedback, closed) = tokio::time::timeout(TIMEOUT, server)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(path, "/ws/r1");
    assert_eq!(
        chat,
        json!({"type": "message", "speaker": "Alice", "content": "Hello everyone"})
    );
    assert_eq!(feedback, json!({"type": "request_feedback"}));
    assert!(closed);
}

#[tokio::test]
async fn failed_handshake_closes_with_error() {
    let (listener, config) = bind().await;
    drop(listener);

    let mut session = RoomSession::open(&config, descriptor("r1"), "Alice");
    let opened = tokio::time::timeout(TIMEOUT, session.wait_until_open())
        .await
        .unwrap();

    assert!(!opened);
    assert_eq!(session.status(), ConnectionStatus::Closed);
    assert!(matches!(
        session.channel().last_error(),
        Some(ChannelError::Transport(_))
    ));
    assert!(!session.send_chat("hello?"));
}

#[tokio::test]
async fn server_close_ends_session() {
    let (listener, config) = bind().await;

    let server = tokio::spawn(async move {
        let (mut ws, _) = accept(&listener).await;
        send_json(
            &mut ws,
            json!({
                "type": "message",
                "speaker": "Bob",
                "content": "Bye",
                "message_type": "user",
                "timestamp": "t1"
            }),
        )
        .await;
        ws.close(None).await.unwrap();
    });

    let mut session = RoomSession::open(&config, descriptor("r1"), "Alice");
    wait_for_close_status(&mut session).await;

    assert_eq!(session.status(), ConnectionStatus::Closed);
    assert_eq!(session.messages().len(), 1);
    assert!(session.channel().last_error().is_none());
    assert!(!session.send_chat("still there?"));
    assert!(session.next_event().await.is_none());

    server.await.unwrap();
}

#[tokio::test]
async fn bad_frames_do_not_end_session() {
    let (listener, config) = bind().await;

    let server = tokio::spawn(async move {
        let (mut ws, _) = accept(&listener).await;
        ws.send(Message::text("{not json".to_string())).await.unwrap();
        send_json(&mut ws, json!({"type": "typing", "speaker": "Bob"})).await;
        send_json(&mut ws, json!({"type": "error", "message": "Room not found or inactive"})).await;
        send_json(
            &mut ws,
            json!({
                "type": "message",
                "speaker": "Bob",
                "content": "Hi",
                "message_type": "human",
                "timestamp": "t1"
            }),
        )
        .await;
        wait_for_close(&mut ws).await
    });

    let mut session = RoomSession::open(&config, descriptor("r1"), "Alice");
    wait_for_messages(&mut session, 1).await;

    assert_eq!(session.status(), ConnectionStatus::Open);
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].content, "Hi");

    session.leave().await;
    assert!(tokio::time::timeout(TIMEOUT, server).await.unwrap().unwrap());
}

#[tokio::test]
async fn send_after_dropped_connection_keeps_transport_reason() {
    let (listener, config) = bind().await;

    let server = tokio::spawn(async move {
        let (ws, _) = accept(&listener).await;
        // Hang up without a close frame.
        drop(ws);
    });

    let mut session = RoomSession::open(&config, descriptor("r1"), "Alice");
    assert!(tokio::time::timeout(TIMEOUT, session.wait_until_open()).await.unwrap());
    server.await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!session.send_chat("anyone there?"));
    assert_eq!(session.status(), ConnectionStatus::Closed);
    assert!(!matches!(
        session.channel().last_error(),
        Some(ChannelError::Transport(reason)) if reason == "connection task has stopped"
    ));
}

#[tokio::test]
async fn dropping_session_releases_connection() {
    let (listener, config) = bind().await;

    let server = tokio::spawn(async move {
        let (mut ws, _) = accept(&listener).await;
        wait_for_close(&mut ws).await
    });

    let mut session = RoomSession::open(&config, descriptor("r1"), "Alice");
    assert!(tokio::time::timeout(TIMEOUT, session.wait_until_open()).await.unwrap());
    drop(session);

    assert!(tokio::time::timeout(TIMEOUT, server).await.unwrap().unwrap());
}
