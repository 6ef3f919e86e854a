//! Network protocol message types
//!
//! All frames are JSON-serialized and length-prefixed on the wire. A
//! connection may create and list channels, then joins exactly one
//! channel; after the join only `Text` and `Ping` are accepted.

use rostrum_core::{ChannelSummary, ChatMessage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Frames sent by a connecting party
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Create a new channel guarded by `secret`
    CreateChannel { name: String, secret: String },

    /// Request the channel list
    ListChannels,

    /// Join a channel. Without a secret the client is read-only.
    Join {
        channel: String,
        name: String,
        #[serde(default)]
        secret: Option<String>,
    },

    /// Inbound chat text, or the readiness token
    Text { body: String },

    /// Ping to keep connection alive
    Ping,
}

/// Frames sent by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// Channel created
    ChannelCreated { name: String, channel_id: Uuid },

    /// Current channels
    ChannelList { channels: Vec<ChannelSummary> },

    /// A pre-join request failed
    Refused { reason: String },

    /// Join succeeded
    JoinAccepted {
        channel: String,
        channel_id: Uuid,
        client_id: Uuid,
        can_send: bool,
    },

    /// Join failed; the server closes the connection
    JoinRejected { reason: String },

    /// A channel message, broadcast or private
    Message(ChatMessage),

    /// Pong response to ping
    Pong,

    /// The channel or server is going away
    ServerShutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_frame_shape() {
        let frame = ServerFrame::Message(ChatMessage::user("alice", "Hello"));
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["type"], "Message");
        assert_eq!(json["sender"], "alice");
        assert_eq!(json["text"], "Hello");
    }

    #[test]
    fn test_join_secret_optional() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"Join","channel":"debate1","name":"o"}"#).unwrap();

        match frame {
            ClientFrame::Join { secret, .. } => assert!(secret.is_none()),
            _ => panic!("Wrong frame type"),
        }
    }
}
