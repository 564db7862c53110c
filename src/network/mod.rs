//! Network module - Drives a live RCON connection
//!
//! Provides:
//! - The connection engine (dial, authenticate, execute, keepalive, close)
//! - Connection state and read error classification

mod client;
mod connection;

pub use client::*;
pub use connection::*;

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::protocol::DEFAULT_MAX_PACKET_SIZE;

/// Tuning for a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Connection timeout in ms
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Keepalive interval in ms
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_ms: u64,
    /// Command sent as keepalive
    #[serde(default = "default_keepalive_command")]
    pub keepalive_command: String,
    /// Largest declared packet accepted before the read buffer is reset
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_keepalive_interval() -> u64 {
    10_000
}

fn default_keepalive_command() -> String {
    "PING_CONNECTION".to_string()
}

fn default_max_packet_size() -> usize {
    DEFAULT_MAX_PACKET_SIZE
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            keepalive_interval_ms: default_keepalive_interval(),
            keepalive_command: default_keepalive_command(),
            max_packet_size: default_max_packet_size(),
        }
    }
}

/// Resolve a hostname to a socket address
pub async fn resolve_host(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    use tokio::net::lookup_host;

    let addr_string = format!("{}:{}", host, port);
    let mut addrs = lookup_host(&addr_string).await?;

    addrs.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Could not resolve host: {}", host),
        )
    })
}
