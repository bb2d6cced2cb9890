use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::errors::{CreationError, LookupError, ValidationError};

/// Upper bound on the participant roster accepted by the server.
pub const MAX_PARTICIPANTS: usize = 6;

static ROOM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("room id pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    /// Facilitated towards convergence.
    #[default]
    Discussion,
    /// Facilitated towards exploring opposing positions.
    Debate,
}

impl RoomKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Discussion => "Discussion (Convergence)",
            Self::Debate => "Debate (Exploration)",
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Discussion => "discussion",
            Self::Debate => "debate",
        })
    }
}

impl std::str::FromStr for RoomKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discussion" => Ok(Self::Discussion),
            "debate" => Ok(Self::Debate),
            other => Err(format!("unknown room type '{other}' (expected discussion or debate)")),
        }
    }
}

/// A creation request that already passed validation.
///
/// Only [`RoomProvisioner::validate`] builds one, so every request reaching the
/// creation endpoint has a trimmed, non-empty roster of at most six names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSetupRequest {
    room_type: RoomKind,
    participant_names: Vec<String>,
}

impl RoomSetupRequest {
    pub fn room_type(&self) -> RoomKind {
        self.room_type
    }

    pub fn participant_names(&self) -> &[String] {
        &self.participant_names
    }
}

/// A room as confirmed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoomDescriptor {
    pub room_id: String,
    pub topic: String,
    pub room_type: RoomKind,
    pub participants: Vec<String>,
}

/// A row of the active room listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub room_type: RoomKind,
    #[serde(default)]
    pub topic: Option<String>,
    pub participants: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl From<RoomSummary> for RoomDescriptor {
    fn from(summary: RoomSummary) -> Self {
        Self {
            room_id: summary.room_id,
            topic: summary.topic.unwrap_or_default(),
            room_type: summary.room_type,
            participants: summary.participants,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RoomListResponse {
    rooms: Vec<RoomSummary>,
}

#[derive(Debug, Deserialize)]
struct RoomDetailsResponse {
    room: RoomSummary,
}

/// Error body produced by the server on rejected requests.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Turns setup data into a room on the server.
pub struct RoomProvisioner {
    client: reqwest::Client,
    config: ServerConfig,
}

impl RoomProvisioner {
    pub fn new(config: ServerConfig) -> Result<Self, CreationError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CreationError::TransportError(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Validate the setup form.
    ///
    /// Blank roster entries are dropped and the rest trimmed before counting.
    pub fn validate<S: AsRef<str>>(
        name: &str,
        room_type: RoomKind,
        participant_names: &[S],
    ) -> Result<RoomSetupRequest, ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let filled: Vec<String> = participant_names
            .iter()
            .map(|p| p.as_ref().trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        if filled.is_empty() {
            return Err(ValidationError::NoParticipants);
        }
        if filled.len() > MAX_PARTICIPANTS {
            return Err(ValidationError::TooManyParticipants { count: filled.len() });
        }

        Ok(RoomSetupRequest {
            room_type,
            participant_names: filled,
        })
    }

    /// Submit a validated request to the creation endpoint.
    ///
    /// Single exchange, no retry: callers retry by calling this again.
    pub async fn create_room(&self, request: &RoomSetupRequest) -> Result<RoomDescriptor, CreationError> {
        let url = self.config.rooms_endpoint();
        tracing::info!(
            "creating {} room with {} participants at {url}",
            request.room_type,
            request.participant_names.len()
        );

        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| CreationError::TransportError(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = error_detail(resp).await;
            tracing::warn!("room creation rejected: status={status} detail={detail:?}");
            return Err(CreationError::ServerRejected {
                status: status.as_u16(),
                detail,
            });
        }

        let descriptor: RoomDescriptor = resp
            .json()
            .await
            .map_err(|e| CreationError::TransportError(format!("invalid response: {e}")))?;

        tracing::info!(
            "room {} created, topic: {}",
            descriptor.room_id,
            descriptor.topic
        );
        Ok(descriptor)
    }

    /// Look up an existing room so it can be joined.
    pub async fn fetch_room(&self, room_id: &str) -> Result<RoomDescriptor, LookupError> {
        let url = self.config.room_endpoint(room_id);
        tracing::debug!("fetching room from {url}");

        let resp = self.get(&url).await?;
        let details: RoomDetailsResponse = resp
            .json()
            .await
            .map_err(|e| LookupError::Transport(format!("invalid response: {e}")))?;
        Ok(details.room.into())
    }

    /// List the rooms the server currently considers active.
    pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>, LookupError> {
        let url = self.config.rooms_endpoint();
        tracing::debug!("listing rooms from {url}");

        let resp = self.get(&url).await?;
        let listing: RoomListResponse = resp
            .json()
            .await
            .map_err(|e| LookupError::Transport(format!("invalid response: {e}")))?;
        Ok(listing.rooms)
    }

    /// Extract and validate a room id from user input.
    /// Accepts a bare id (`ab12cd34`) or any URL ending in it
    /// (`ws://host/ws/ab12cd34`, `http://host/api/rooms/ab12cd34/`).
    pub fn parse_room_id(input: &str) -> Result<String, ValidationError> {
        let input = input.trim().trim_end_matches('/');
        let candidate = if input.contains('/') {
            input.rsplit('/').next().unwrap_or("")
        } else {
            input
        };
        if ROOM_ID.is_match(candidate) {
            Ok(candidate.to_string())
        } else {
            Err(ValidationError::InvalidRoomId(candidate.to_string()))
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, LookupError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = error_detail(resp).await;
            return Err(LookupError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(resp)
    }
}

async fn error_detail(resp: reqwest::Response) -> Option<String> {
    resp.json::<ErrorBody>().await.ok().map(|body| body.detail)
}
