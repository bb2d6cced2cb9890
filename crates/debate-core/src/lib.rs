//! Debate room client core.
//!
//! Room provisioning over HTTP and the live room channel over WebSocket.
//! No terminal or UI dependencies; consumed by the `debate-room` shell.

pub mod channel;
pub mod config;
pub mod errors;
pub mod events;
pub mod protocol;
pub mod provision;
pub mod roster;
pub mod session;
pub mod settings;
pub mod transport;

pub use channel::SessionChannel;
pub use config::ServerConfig;
pub use errors::{
    ChannelError, ConfigError, CreationError, LookupError, ProtocolError, ValidationError,
};
pub use events::{
    ChatMessage, ConnectionStatus, EventEmitter, MessageType, SessionEvent, SessionEventListener,
};
pub use provision::{RoomDescriptor, RoomKind, RoomProvisioner, RoomSetupRequest, RoomSummary};
pub use roster::RosterForm;
pub use session::RoomSession;
pub use settings::{Settings, SettingsStore};
pub use transport::{ChannelEvent, Transport, WsTransport};
