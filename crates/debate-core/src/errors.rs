use thiserror::Error;

/// Local setup errors. These block room creation until the user fixes the form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please enter your name")]
    EmptyName,
    #[error("please enter at least one participant name")]
    NoParticipants,
    #[error("maximum {max} participants allowed, got {count}", max = crate::provision::MAX_PARTICIPANTS)]
    TooManyParticipants { count: usize },
    #[error("invalid room id: '{0}'")]
    InvalidRoomId(String),
}

/// Errors from the room-creation exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreationError {
    #[error("could not create room: server responded with {status}{}", detail_suffix(.detail))]
    ServerRejected { status: u16, detail: Option<String> },
    #[error("could not create room: {0}")]
    TransportError(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default()
}

/// Errors from the room lookup endpoints (listing and fetching rooms).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("room request failed: server responded with {status}{}", detail_suffix(.detail))]
    Rejected { status: u16, detail: Option<String> },
    #[error("room request failed: {0}")]
    Transport(String),
}

/// Failures of a live session channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("could not encode frame: {0}")]
    Encode(String),
    #[error("channel is closed")]
    Closed,
}

/// An inbound frame that could not be understood. Logged, never shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_rejected_appends_detail() {
        let err = CreationError::ServerRejected {
            status: 400,
            detail: Some("Participant count must be between 1 and 6".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "could not create room: server responded with 400 (Participant count must be between 1 and 6)"
        );
    }

    #[test]
    fn server_rejected_without_detail() {
        let err = CreationError::ServerRejected { status: 500, detail: None };
        assert_eq!(err.to_string(), "could not create room: server responded with 500");
    }

    #[test]
    fn too_many_participants_message() {
        let err = ValidationError::TooManyParticipants { count: 7 };
        assert_eq!(err.to_string(), "maximum 6 participants allowed, got 7");
    }
}
