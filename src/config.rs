use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1 << 20;

/// Settings for the serving side. Missing fields fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Requests larger than this are answered with an `error` reply.
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: (Ipv4Addr::UNSPECIFIED, DEFAULT_PORT).into(),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub max_reply_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_reply_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}
