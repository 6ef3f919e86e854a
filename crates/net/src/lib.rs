//! Rostrum Network Library
//!
//! Hosts debate channels over TCP.
//!
//! # Architecture
//!
//! - **Registry**: name to channel map; channels are independent
//! - **Session**: one task per channel owning its debate state
//! - **Fanout**: per-client bounded outbound queues
//! - **Server**: accepts connections, one writer per socket
//! - **Client**: terminal-side connection
//! - **Protocol**: Length-prefixed JSON frames
//!
//! # Usage
//!
//! ```ignore
//! let registry = Arc::new(Registry::from_config(&config, analyst).await?);
//! let server = Server::start(config.server.bind, registry).await?;
//!
//! let mut client = Client::connect(server.addr()).await?;
//! client.join("debate1", "alice", Some("p1")).await?;
//! while let Some(event) = client.next_event().await {
//!     if let ClientEvent::Message(msg) = event { /* render */ }
//! }
//! ```

pub mod client;
pub mod error;
pub mod fanout;
mod frame;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

#[cfg(test)]
mod testing;

pub use client::{Client, ClientEvent};
pub use error::{Error, Result};
pub use protocol::{ClientFrame, ServerFrame};
pub use registry::Registry;
pub use server::Server;
pub use session::{ChannelHandle, ChannelSettings, ChannelSnapshot, Membership, Session};

/// Default port for Rostrum servers
pub const DEFAULT_PORT: u16 = 7331;
