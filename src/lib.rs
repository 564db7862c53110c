//! squad-rcon - RCON client engine for Squad game servers
//!
//! Speaks the length-prefixed RCON protocol over TCP: authenticates, runs
//! commands, reassembles multi-packet replies, and turns unsolicited server
//! log lines into typed events.
//!
//! ```no_run
//! # async fn run() -> Result<(), squad_rcon::ClientError> {
//! let rcon = squad_rcon::Rcon::dial("127.0.0.1", 21114, "password").await?;
//! rcon.observers().on_message(|chat| println!("{}: {}", chat.player_name, chat.message));
//! println!("{}", rcon.execute("ShowServerInfo").await?);
//! rcon.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod events;
pub mod network;
pub mod protocol;

pub use dispatch::Observers;
pub use events::{Listing, PushEvent};
pub use network::{
    ClientError, ClientResult, CloseError, ConnectionState, NetworkConfig, Rcon,
};
