use std::time::Duration;

use url::Url;

use crate::errors::ConfigError;

/// Server used when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// Where the room API and the live channels are served.
///
/// Accepts `http(s)://` and `ws(s)://` addresses; the base is always stored in
/// its HTTP form and the WebSocket form is derived per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    base_url: Url,
    /// Optional bound on each HTTP exchange. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl ServerConfig {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let trimmed = input.trim().trim_end_matches('/');
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        let mut base_url =
            Url::parse(&with_scheme).map_err(|e| ConfigError::InvalidUrl(format!("{input}: {e}")))?;

        let http_scheme = match base_url.scheme() {
            "http" | "ws" => "http",
            "https" | "wss" => "https",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
        if base_url.scheme() != http_scheme {
            base_url
                .set_scheme(http_scheme)
                .map_err(|()| ConfigError::UnsupportedScheme(http_scheme.to_string()))?;
        }
        if base_url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!("{input}: missing host")));
        }

        Ok(Self {
            base_url,
            request_timeout: None,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST` target for room creation, `GET` target for listing.
    pub fn rooms_endpoint(&self) -> String {
        format!("{}/api/rooms", self.base())
    }

    pub fn room_endpoint(&self, room_id: &str) -> String {
        format!("{}/api/rooms/{}", self.base(), urlencoding::encode(room_id))
    }

    /// WebSocket address of the live channel for `room_id`.
    pub fn channel_endpoint(&self, room_id: &str) -> String {
        let ws_base = self
            .base()
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!("{ws_base}/ws/{}", urlencoding::encode(room_id))
    }

    fn base(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_SERVER_URL).expect("default server url is valid"),
            request_timeout: None,
        }
    }
}
