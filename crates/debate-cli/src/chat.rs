use std::sync::Arc;

use anyhow::Result;
use debate_core::{ChatMessage, RoomDescriptor, RoomSession, ServerConfig, SessionEvent, SessionEventListener};

use crate::setup::Input;

/// A line typed in the chat loop.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Chat(&'a str),
    Feedback,
    Status,
    Who,
    Help,
    Leave,
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        match trimmed {
            "/feedback" => Self::Feedback,
            "/status" => Self::Status,
            "/who" => Self::Who,
            "/help" => Self::Help,
            "/leave" | "/quit" => Self::Leave,
            cmd if cmd.starts_with('/') => Self::Unknown(cmd),
            _ => Self::Chat(line),
        }
    }
}

enum Step {
    Continue,
    Leave,
    Ended,
}

/// Prints the transcript as the session reports it.
struct TranscriptPrinter {
    local_name: String,
}

impl SessionEventListener for TranscriptPrinter {
    fn on_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::StatusChanged(status) => println!("* {}", status.label()),
            SessionEvent::RoomJoined { room_id } => println!("* joined room {room_id}"),
            SessionEvent::MessageAppended(msg) => println!("{}", render_message(&msg, &self.local_name)),
            SessionEvent::ServerNotice(notice) => println!("! {notice}"),
            SessionEvent::ChannelFailed(reason) => println!("! connection lost: {reason}"),
        }
    }
}

fn render_message(msg: &ChatMessage, local_name: &str) -> String {
    let time = msg
        .sent_at()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| msg.timestamp.clone());
    let marker = if msg.is_agent() {
        " [agent]"
    } else if msg.speaker == local_name {
        " (you)"
    } else {
        ""
    };
    format!("[{time}] {}{marker}: {}", msg.speaker, msg.content)
}

/// The room roster as `/who` prints it. Participants are people; the
/// facilitator is the only agent.
fn who_lines(local_name: &str, participants: &[String]) -> Vec<String> {
    let mut lines = vec![format!("* {local_name} (you)")];
    lines.extend(
        participants
            .iter()
            .filter(|p| p.as_str() != local_name)
            .map(|p| format!("* {p}")),
    );
    lines.push("* Facilitator [agent]".to_string());
    lines
}

fn print_room(descriptor: &RoomDescriptor) {
    println!("== {} ==", descriptor.room_type.label());
    if !descriptor.topic.is_empty() {
        println!("Topic: {}", descriptor.topic);
    }
    println!("With: {}", descriptor.participants.join(", "));
    println!("Type a message, /feedback for facilitator feedback, /help for commands.");
}

fn print_help() {
    println!("/feedback  ask the facilitator for feedback");
    println!("/status    show the connection state");
    println!("/who       list who is in the room");
    println!("/leave     leave the room");
}

/// Run the interactive chat loop until the user leaves or the channel closes.
pub async fn run(config: &ServerConfig, descriptor: RoomDescriptor, name: &str, input: &mut Input) -> Result<()> {
    print_room(&descriptor);

    let mut session = RoomSession::open(config, descriptor, name);
    session.add_listener(Arc::new(TranscriptPrinter {
        local_name: session.local_name().to_string(),
    }));

    loop {
        let step = tokio::select! {
            event = session.next_event() => match event {
                Some(_) => Step::Continue,
                None => Step::Ended,
            },
            line = input.next_line() => match line? {
                Some(line) => handle_line(&mut session, &line),
                None => Step::Leave,
            },
            _ = tokio::signal::ctrl_c() => Step::Leave,
        };
        match step {
            Step::Continue => {}
            Step::Leave => {
                session.leave().await;
                println!("Left the room.");
                return Ok(());
            }
            Step::Ended => {
                if let Some(e) = session.channel().last_error() {
                    anyhow::bail!("{e}");
                }
                println!("The room closed the connection.");
                return Ok(());
            }
        }
    }
}

fn handle_line(session: &mut RoomSession, line: &str) -> Step {
    match Command::parse(line) {
        Command::Chat(text) => {
            if !text.trim().is_empty() && !session.send_chat(text) {
                println!("! not connected ({})", session.status().label());
            }
        }
        Command::Feedback => {
            if !session.request_feedback() {
                if session.messages().is_empty() {
                    println!("! nothing to give feedback on yet");
                } else {
                    println!("! not connected ({})", session.status().label());
                }
            }
        }
        Command::Status => println!(
            "* {} to room {}, {} messages",
            session.status().label(),
            session.descriptor().room_id,
            session.messages().len()
        ),
        Command::Who => {
            for line in who_lines(session.local_name(), &session.descriptor().participants) {
                println!("{line}");
            }
        }
        Command::Help => print_help(),
        Command::Leave => return Step::Leave,
        Command::Unknown(cmd) => println!("! unknown command {cmd}, try /help"),
    }
    Step::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use debate_core::MessageType;

    fn message(speaker: &str, message_type: MessageType, timestamp: &str) -> ChatMessage {
        ChatMessage {
            speaker: speaker.to_string(),
            content: "Hello".to_string(),
            message_type,
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("/feedback"), Command::Feedback);
        assert_eq!(Command::parse(" /who "), Command::Who);
        assert_eq!(Command::parse("/quit"), Command::Leave);
        assert_eq!(Command::parse("/dance"), Command::Unknown("/dance"));
        assert_eq!(Command::parse("hello /who"), Command::Chat("hello /who"));
    }

    #[test]
    fn marks_agents_and_self() {
        let agent = message("Facilitator", MessageType::Agent, "2024-05-01T10:01:05.000000");
        assert_eq!(render_message(&agent, "Alice"), "[10:01:05] Facilitator [agent]: Hello");

        let own = message("Alice", MessageType::Human, "2024-05-01T10:01:00Z");
        assert_eq!(render_message(&own, "Alice"), "[10:01:00] Alice (you): Hello");

        let other = message("Bob", MessageType::Human, "2024-05-01T10:02:00");
        assert_eq!(render_message(&other, "Alice"), "[10:02:00] Bob: Hello");
    }

    #[test]
    fn who_lists_participants_as_people() {
        let roster = vec!["Bob".to_string(), "Alice".to_string(), "Carol".to_string()];
        assert_eq!(
            who_lines("Alice", &roster),
            vec!["* Alice (you)", "* Bob", "* Carol", "* Facilitator [agent]"]
        );
    }

    #[test]
    fn unparseable_timestamp_is_shown_verbatim() {
        let msg = message("Bob", MessageType::Human, "t1");
        assert_eq!(render_message(&msg, "Alice"), "[t1] Bob: Hello");
    }
}
